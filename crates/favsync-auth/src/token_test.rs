use chrono::{Duration, Utc};

use super::*;

const SECRET: &str = "jwt-signing-secret";
const IDENTITY: &str = "cinephile";
const WORD: &str = "open-sesame";

fn issuer() -> TokenIssuer {
    TokenIssuer::new(SECRET, IDENTITY, WORD)
}

fn authenticator() -> TokenAuthenticator {
    TokenAuthenticator::new(SECRET, IDENTITY)
}

#[test]
fn issued_token_verifies_for_configured_identity() {
    let issued = issuer().issue(IDENTITY, WORD).expect("issue");
    let claims = authenticator().verify(&issued.token).expect("verify");

    assert!(claims.authorized);
    assert_eq!(claims.username, IDENTITY);
    assert_eq!(claims.exp, issued.expires_at.timestamp());
}

#[test]
fn issued_token_is_valid_for_one_year() {
    let now = Utc::now();
    let issued = issuer().issue_at(IDENTITY, WORD, now).expect("issue");
    assert_eq!(issued.expires_at - now, Duration::days(365));
}

#[test]
fn issuance_requires_secret_word() {
    let err = issuer().issue(IDENTITY, "guess").expect_err("wrong word");
    assert!(matches!(err, AuthError::InvalidSecretWord));
}

#[test]
fn issuance_requires_configured_identity() {
    let err = issuer().issue("someone-else", WORD).expect_err("wrong identity");
    assert!(matches!(err, AuthError::UnknownIdentity(ref u) if u == "someone-else"));
}

#[test]
fn expired_token_is_rejected() {
    let issued_at = Utc::now() - Duration::days(TOKEN_VALIDITY_DAYS + 1);
    let issued = issuer().issue_at(IDENTITY, WORD, issued_at).expect("issue");

    let err = authenticator().verify(&issued.token).expect_err("expired");
    assert!(matches!(err, AuthError::Expired));
}

#[test]
fn token_expired_seconds_ago_is_rejected() {
    let issued_at = Utc::now() - Duration::days(TOKEN_VALIDITY_DAYS) - Duration::seconds(30);
    let issued = issuer().issue_at(IDENTITY, WORD, issued_at).expect("issue");

    let err = authenticator().verify(&issued.token).expect_err("expired");
    assert!(matches!(err, AuthError::Expired));
}

#[test]
fn foreign_identity_is_rejected() {
    let other = TokenIssuer::new(SECRET, "someone-else", WORD);
    let issued = other.issue("someone-else", WORD).expect("issue");

    let err = authenticator().verify(&issued.token).expect_err("mismatch");
    assert!(matches!(err, AuthError::IdentityMismatch));
}

#[test]
fn identity_comparison_is_case_sensitive() {
    let upper = TokenIssuer::new(SECRET, "Cinephile", WORD);
    let issued = upper.issue("Cinephile", WORD).expect("issue");

    assert!(matches!(
        authenticator().verify(&issued.token),
        Err(AuthError::IdentityMismatch)
    ));
}

#[test]
fn wrong_signing_secret_is_rejected() {
    let forged = TokenIssuer::new("another-secret", IDENTITY, WORD)
        .issue(IDENTITY, WORD)
        .expect("issue");

    let err = authenticator().verify(&forged.token).expect_err("bad signature");
    assert!(matches!(err, AuthError::InvalidToken(_)));
}

#[test]
fn garbage_token_is_rejected() {
    let err = authenticator().verify("not-a-jwt").expect_err("garbage");
    assert!(matches!(err, AuthError::InvalidToken(_)));
}

#[test]
fn token_without_username_claim_is_rejected() {
    #[derive(serde::Serialize)]
    struct Legacy {
        authorized: bool,
        exp: i64,
    }
    let legacy = Legacy {
        authorized: true,
        exp: (Utc::now() + Duration::days(1)).timestamp(),
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &legacy,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode");

    assert!(matches!(
        authenticator().verify(&token),
        Err(AuthError::InvalidToken(_))
    ));
}

#[test]
fn authorize_header_checks_shape_then_token() {
    let issued = issuer().issue(IDENTITY, WORD).expect("issue");
    let header = format!("Bearer {}", issued.token);

    assert!(authenticator().authorize_header(Some(&header)).is_ok());
    assert!(matches!(
        authenticator().authorize_header(None),
        Err(AuthError::MissingHeader)
    ));
    assert!(matches!(
        authenticator().authorize_header(Some(&issued.token)),
        Err(AuthError::MalformedHeader)
    ));
}

#[test]
fn debug_output_redacts_secrets() {
    let rendered = format!("{:?} {:?}", issuer(), authenticator());
    assert!(!rendered.contains(SECRET));
    assert!(!rendered.contains(WORD));
    assert!(rendered.contains(IDENTITY));
}

#[test]
fn generated_secret_has_requested_length_and_alphabet() {
    let secret = generate_secret(48);
    assert_eq!(secret.len(), 48);
    assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(secret, generate_secret(48));
}
