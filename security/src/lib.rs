// security/src/lib.rs
// Authentication for staff accounts: signed access/refresh tokens and the
// email + password login flow. Role checks live with the workflow services.

pub mod credentials;
pub mod jwt;

pub use credentials::{CredentialService, LoginResponse};
pub use jwt::{Claims, TokenKind, TokenPair, TokenService};

use models::ServiceError;
use thiserror::Error;

/// Custom authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account inactive")]
    InactiveAccount,
    #[error("invalid or expired token: {0}")]
    InvalidToken(String),
    #[error("expected a {expected} token")]
    WrongTokenKind { expected: TokenKind },
    #[error("failed to sign token: {0}")]
    TokenCreation(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ServiceError::Unauthenticated(err.to_string()),
            AuthError::InactiveAccount => ServiceError::Forbidden(err.to_string()),
            AuthError::InvalidToken(_) | AuthError::WrongTokenKind { .. } => {
                ServiceError::Unauthenticated(err.to_string())
            }
            AuthError::TokenCreation(msg) => ServiceError::Persistence(msg),
            AuthError::Service(inner) => inner,
        }
    }
}
