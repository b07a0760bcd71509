//! Store trait and SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::reclaim::{ReclaimDecision, Reclaimer};
use crate::repos::{SessionRepo, TaskRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined docket store trait.
#[async_trait]
pub trait DocketStore: TaskRepo + UserRepo + SessionRepo + Send + Sync {
    /// Apply the schema. Idempotent.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    reclaimer: Reclaimer,
}

impl SqliteStore {
    /// Create a new SQLite store and apply the schema.
    ///
    /// `reclaim_queue_capacity` bounds the soft-delete signal queue; each
    /// store instance owns its own queue.
    pub async fn new(
        path: impl AsRef<Path>,
        reclaim_queue_capacity: usize,
    ) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures under load.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            reclaimer: Reclaimer::new(reclaim_queue_capacity),
        };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the reclaimer (tests inspect queue occupancy).
    pub fn reclaimer(&self) -> &Reclaimer {
        &self.reclaimer
    }
}

#[async_trait]
impl DocketStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Run the reclamation decision that follows a committed soft delete.
///
/// Shared by both backends. A `PurgeNow` decision runs the purge inline;
/// purge failures are logged and swallowed — the soft delete has already
/// committed and the next saturating delete retries naturally.
pub(crate) async fn reclaim_after_soft_delete<R>(reclaimer: &Reclaimer, repo: &R)
where
    R: TaskRepo + ?Sized,
{
    if reclaimer.note_soft_delete().await != ReclaimDecision::PurgeNow {
        return;
    }
    match repo.purge_tombstoned().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "reclaimed tombstoned tasks"),
        Err(e) => tracing::warn!(error = %e, "tombstone purge failed, retried on next saturation"),
    }
}

// Repository trait implementations for SqliteStore.
mod sqlite_impl {
    use super::*;
    use crate::models::{SessionRow, TaskRow, UserRow};
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl TaskRepo for SqliteStore {
        async fn create_task(&self, task: &TaskRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO tasks (task_id, title, description, status, user_id, deleted, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(task.task_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.status)
            .bind(task.user_id)
            .bind(task.deleted)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<TaskRow>> {
            // No deleted filter: tombstoned rows stay addressable until purged.
            let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE task_id = ?")
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_active_tasks(&self, owner_id: Uuid) -> StoreResult<Vec<TaskRow>> {
            let rows = sqlx::query_as::<_, TaskRow>(
                "SELECT * FROM tasks WHERE user_id = ? AND deleted = FALSE ORDER BY created_at",
            )
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn update_task(&self, task: &TaskRow) -> StoreResult<()> {
            let result = sqlx::query(
                "UPDATE tasks SET title = ?, description = ?, status = ?, updated_at = ? WHERE task_id = ?",
            )
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.status)
            .bind(task.updated_at)
            .bind(task.task_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!(
                    "task {} not found",
                    task.task_id
                )));
            }
            Ok(())
        }

        async fn soft_delete_task(&self, task_id: Uuid) -> StoreResult<()> {
            // Single conditional update; the affected-row check makes the
            // false→true transition race-free under concurrent deletes.
            let result = sqlx::query(
                "UPDATE tasks SET deleted = TRUE, updated_at = ? WHERE task_id = ? AND deleted = FALSE",
            )
            .bind(OffsetDateTime::now_utc())
            .bind(task_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!(
                    "task {task_id} not found or already deleted"
                )));
            }

            reclaim_after_soft_delete(&self.reclaimer, self).await;
            Ok(())
        }

        async fn purge_tombstoned(&self) -> StoreResult<u64> {
            let mut tx = self.pool.begin().await?;
            let result = sqlx::query("DELETE FROM tasks WHERE deleted = TRUE")
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(result.rows_affected())
        }
    }

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn create_user(&self, user: &UserRow) -> StoreResult<()> {
            let result = sqlx::query(
                r#"
                INSERT INTO users (user_id, username, email, password_hash, role, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user.user_id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    Err(StoreError::AlreadyExists(format!(
                        "username '{}' already exists",
                        user.username
                    )))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn update_user(&self, user: &UserRow) -> StoreResult<()> {
            let result = sqlx::query(
                "UPDATE users SET username = ?, email = ?, password_hash = ?, role = ?, updated_at = ? WHERE user_id = ?",
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(user.updated_at)
            .bind(user.user_id)
            .execute(&self.pool)
            .await;

            match result {
                Ok(r) if r.rows_affected() == 0 => Err(StoreError::NotFound(format!(
                    "user {} not found",
                    user.user_id
                ))),
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    Err(StoreError::AlreadyExists(format!(
                        "username '{}' already exists",
                        user.username
                    )))
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn delete_user(&self, user_id: Uuid) -> StoreResult<()> {
            let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("user {user_id} not found")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SessionRepo for SqliteStore {
        async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
            sqlx::query(
                r#"
                INSERT INTO sessions (session_id, user_id, token_hash, created_at, expires_at, last_used_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.session_id)
            .bind(session.user_id)
            .bind(&session.token_hash)
            .bind(session.created_at)
            .bind(session.expires_at)
            .bind(session.last_used_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>> {
            let row =
                sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = ?")
                    .bind(token_hash)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        }

        async fn touch_session(
            &self,
            session_id: Uuid,
            used_at: OffsetDateTime,
        ) -> StoreResult<()> {
            sqlx::query("UPDATE sessions SET last_used_at = ? WHERE session_id = ?")
                .bind(used_at)
                .bind(session_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn delete_session(&self, session_id: Uuid) -> StoreResult<()> {
            sqlx::query("DELETE FROM sessions WHERE session_id = ?")
                .bind(session_id)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
            let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        }

        async fn delete_expired_sessions(&self, now: OffsetDateTime) -> StoreResult<u64> {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- User accounts
CREATE TABLE IF NOT EXISTS users (
    user_id BLOB PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);

-- Tasks with tombstone flag for soft delete
CREATE TABLE IF NOT EXISTS tasks (
    task_id BLOB PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'new',
    user_id BLOB NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_owner_active ON tasks(user_id, deleted);
CREATE INDEX IF NOT EXISTS idx_tasks_deleted ON tasks(deleted) WHERE deleted = 1;

-- Server-side sessions
CREATE TABLE IF NOT EXISTS sessions (
    session_id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    last_used_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_sessions_token_hash ON sessions(token_hash);
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
"#;
