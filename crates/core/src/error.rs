//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid password: {0}")]
    InvalidPassword(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid task status: {0}")]
    InvalidStatus(String),

    #[error("invalid title: {0}")]
    InvalidTitle(String),

    #[error("invalid description: {0}")]
    InvalidDescription(String),

    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
