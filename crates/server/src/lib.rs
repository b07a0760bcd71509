//! HTTP API server for the docket task service.
//!
//! This crate provides the HTTP surface:
//! - User registration, login, logout
//! - Owner-scoped task CRUD with tombstone soft delete
//! - Session cookie / bearer token authentication middleware
//! - Health check

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::TraceId;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
