//! User repository trait.

use crate::error::StoreResult;
use crate::models::UserRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for user accounts.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create a user. Fails with AlreadyExists on a duplicate username.
    async fn create_user(&self, user: &UserRow) -> StoreResult<()>;

    /// Get a user by id.
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRow>>;

    /// Get a user by username.
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>>;

    /// Overwrite username/email/password/role. Fails with NotFound if the
    /// user does not exist, AlreadyExists if the new username is taken.
    async fn update_user(&self, user: &UserRow) -> StoreResult<()>;

    /// Delete a user. Fails with NotFound if the user does not exist.
    async fn delete_user(&self, user_id: Uuid) -> StoreResult<()>;
}
