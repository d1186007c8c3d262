//! Bearer-token authentication bound to a single configured identity.
//!
//! Tokens are HS256 JWTs carrying an identity claim and an expiry. Issuance
//! is an administrative operation gated on a shared secret word; verification
//! is stateless.

mod error;
mod header;
mod token;

pub use error::AuthError;
pub use header::parse_bearer;
pub use token::{
    generate_secret, Claims, IssuedToken, TokenAuthenticator, TokenIssuer, TOKEN_VALIDITY_DAYS,
};
