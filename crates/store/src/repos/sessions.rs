//! Session repository trait.

use crate::error::StoreResult;
use crate::models::SessionRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for server-side sessions.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Persist a new session.
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()>;

    /// Look up a session by token hash. Expiry is the caller's check.
    async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>>;

    /// Update the last-used timestamp. Best-effort: callers may fire and
    /// forget.
    async fn touch_session(&self, session_id: Uuid, used_at: OffsetDateTime) -> StoreResult<()>;

    /// Delete a session (logout).
    async fn delete_session(&self, session_id: Uuid) -> StoreResult<()>;

    /// Delete every session belonging to a user (account deletion).
    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Delete sessions that expired before `now`; returns the count removed.
    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> StoreResult<u64>;
}
