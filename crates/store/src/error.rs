//! Storage layer error types.

use thiserror::Error;

/// Postgres SQLSTATE for a statement cancelled by statement_timeout.
const PG_QUERY_CANCELED: &str = "57014";

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("storage timeout: {0}")]
    Timeout(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            // Deadline overruns must stay distinguishable from NotFound.
            sqlx::Error::PoolTimedOut => {
                Self::Timeout("connection pool timed out".to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_QUERY_CANCELED) => {
                Self::Timeout(db.to_string())
            }
            other => Self::Database(other),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
