//! Repository traits implemented by every storage backend.

pub mod sessions;
pub mod tasks;
pub mod users;

pub use sessions::SessionRepo;
pub use tasks::TaskRepo;
pub use users::UserRepo;
