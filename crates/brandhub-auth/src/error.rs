//! Authentication error types.

use brandhub_core::error::BrandError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for BrandError {
    fn from(err: AuthError) -> Self {
        match err {
            // Inactive accounts read exactly like a wrong password.
            AuthError::InvalidCredentials | AuthError::AccountInactive => {
                BrandError::invalid_credentials()
            }
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => {
                BrandError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::Crypto(msg) => BrandError::Crypto(msg),
        }
    }
}
