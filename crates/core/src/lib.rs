//! Core domain types and shared logic for the docket task service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Task status lifecycle and field validation
//! - User roles and credential validation
//! - Session token minting and hashing
//! - Password hashing
//! - Configuration types

pub mod config;
pub mod error;
pub mod password;
pub mod session;
pub mod task;
pub mod user;

pub use error::{Error, Result};
pub use session::{SESSION_COOKIE, generate_session_token, hash_session_token};
pub use task::TaskStatus;
pub use user::Role;

/// Default capacity of the reclamation signal queue.
pub const DEFAULT_RECLAIM_QUEUE_CAPACITY: usize = 10;

/// Default session lifetime: 1 hour.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
