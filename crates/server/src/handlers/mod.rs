//! HTTP request handlers.

pub mod common;
pub mod health;
pub mod tasks;
pub mod users;

pub use common::*;
pub use health::*;
pub use tasks::*;
pub use users::*;
