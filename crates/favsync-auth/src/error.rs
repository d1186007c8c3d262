use thiserror::Error;

/// Why a credential was rejected or could not be minted.
///
/// Callers serving requests must not expose the variant; every verification
/// failure is reported outwardly as the same unauthorized response.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header is not of the form `Bearer <token>`")]
    MalformedHeader,

    #[error("token expired")]
    Expired,

    #[error("token rejected: {0}")]
    InvalidToken(String),

    #[error("token identity does not match the configured identity")]
    IdentityMismatch,

    #[error("invalid secret word")]
    InvalidSecretWord,

    #[error("identity {0:?} is not allowed to hold a token")]
    UnknownIdentity(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}
