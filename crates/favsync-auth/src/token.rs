use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{parse_bearer, AuthError};

/// Lifetime of an issued token.
pub const TOKEN_VALIDITY_DAYS: i64 = 365;

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub authorized: bool,
    pub username: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

/// Verifies bearer tokens against a signing secret and one expected identity.
#[derive(Clone)]
pub struct TokenAuthenticator {
    key: DecodingKey,
    validation: Validation,
    expected_identity: String,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("key", &"[redacted]")
            .field("expected_identity", &self.expected_identity)
            .finish_non_exhaustive()
    }
}

impl TokenAuthenticator {
    #[must_use]
    pub fn new(secret: &str, expected_identity: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expected_identity: expected_identity.into(),
        }
    }

    /// Checks signature, expiry, and that the `username` claim equals the
    /// expected identity exactly.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Expired`], [`AuthError::IdentityMismatch`], or
    /// [`AuthError::InvalidToken`] for any other decoding or signature failure.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.username != self.expected_identity {
            return Err(AuthError::IdentityMismatch);
        }

        Ok(data.claims)
    }

    /// Parses an `Authorization` header value and verifies its token.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] from [`parse_bearer`] or [`TokenAuthenticator::verify`].
    pub fn authorize_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let token = parse_bearer(header)?;
        self.verify(token)
    }
}

/// A freshly minted token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints tokens for the configured identity after checking the secret word.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    identity: String,
    secret_word: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[redacted]")
            .field("identity", &self.identity)
            .field("secret_word", &"[redacted]")
            .finish()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &str, identity: impl Into<String>, secret_word: impl Into<String>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            identity: identity.into(),
            secret_word: secret_word.into(),
        }
    }

    /// Issues a token valid for [`TOKEN_VALIDITY_DAYS`] from now.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue_at`].
    pub fn issue(&self, username: &str, secret_word: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(username, secret_word, Utc::now())
    }

    /// Issues a token whose validity window starts at `issued_at`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSecretWord`] if `secret_word` does not match.
    /// - [`AuthError::UnknownIdentity`] if `username` is not the configured identity.
    /// - [`AuthError::Signing`] if encoding fails.
    pub fn issue_at(
        &self,
        username: &str,
        secret_word: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let word_matches: bool = secret_word
            .as_bytes()
            .ct_eq(self.secret_word.as_bytes())
            .into();
        if !word_matches {
            return Err(AuthError::InvalidSecretWord);
        }
        if username != self.identity {
            return Err(AuthError::UnknownIdentity(username.to_string()));
        }

        let expires_at = issued_at + Duration::days(TOKEN_VALIDITY_DAYS);
        let claims = Claims {
            authorized: true,
            username: username.to_string(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        tracing::info!(username, %expires_at, "issued bearer token");
        Ok(IssuedToken { token, expires_at })
    }
}

/// Generates a random alphanumeric string suitable as a signing secret.
#[must_use]
pub fn generate_secret(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
