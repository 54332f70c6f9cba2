//! Error types for BrandHub.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrandError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    Conflict { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BrandResult<T> = Result<T, BrandError>;

/// Caller-facing classification of a [`BrandError`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authentication,
    Authorization,
    NotFound,
    Infra,
}

impl BrandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrandError::NotFound { .. } => ErrorKind::NotFound,
            BrandError::Conflict { .. } => ErrorKind::Conflict,
            BrandError::AuthenticationFailed { .. } => ErrorKind::Authentication,
            BrandError::AuthorizationDenied { .. } => ErrorKind::Authorization,
            BrandError::Validation { .. } => ErrorKind::Validation,
            BrandError::Database(_) | BrandError::Crypto(_) | BrandError::Internal(_) => {
                ErrorKind::Infra
            }
        }
    }

    /// Message safe to return to callers.
    ///
    /// Infrastructure failures collapse to a fixed text; database and
    /// crypto details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            BrandError::NotFound { entity, .. } => format!("{entity} not found"),
            BrandError::Conflict { entity } => format!("{entity} already exists"),
            BrandError::AuthenticationFailed { .. } => "authentication failed".into(),
            BrandError::AuthorizationDenied { reason } => format!("permission denied: {reason}"),
            BrandError::Validation { message } => message.clone(),
            BrandError::Database(_) | BrandError::Crypto(_) | BrandError::Internal(_) => {
                "internal error, please try again later".into()
            }
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BrandError::Validation {
            message: message.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        BrandError::AuthorizationDenied {
            reason: reason.into(),
        }
    }

    /// The single authentication failure used for every credential
    /// mismatch, so callers cannot tell an unknown key from a wrong
    /// password.
    pub fn invalid_credentials() -> Self {
        BrandError::AuthenticationFailed {
            reason: "invalid credentials".into(),
        }
    }
}
