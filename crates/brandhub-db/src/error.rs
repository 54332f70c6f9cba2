//! Database-specific error types and conversions.

use brandhub_core::error::BrandError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },
}

impl DbError {
    /// Classify a statement error, mapping unique-index and duplicate
    /// record violations to [`DbError::Conflict`].
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if is_unique_violation(&message) {
            DbError::Conflict {
                entity: entity.to_string(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> Self {
        DbError::Query(format!("invalid {what}: {err}"))
    }
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("already contains") || message.contains("already exists")
}

impl From<DbError> for BrandError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BrandError::NotFound { entity, id },
            DbError::Conflict { entity } => BrandError::Conflict { entity },
            other => BrandError::Database(other.to_string()),
        }
    }
}
