//! Database models mapping to the docket schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User account record.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    /// PHC-formatted password hash. Never the raw credential.
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Task record.
///
/// A task is visible to ordinary reads and listings only while `deleted` is
/// false. A tombstoned row (`deleted = true`) remains addressable by id — the
/// ownership check and idempotent-delete logic need to observe it — until the
/// reclamation purge physically removes it.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub task_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    /// Owning user. Only the owner may read this row by id, mutate it, or
    /// delete it.
    pub user_id: Uuid,
    /// Tombstone flag. Set by soft delete; never reset.
    pub deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Server-side session record.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub user_id: Uuid,
    /// SHA-256 hex hash of the opaque session token.
    pub token_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
}

impl SessionRow {
    /// Check whether the session is still valid at `now`.
    pub fn is_valid(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}
