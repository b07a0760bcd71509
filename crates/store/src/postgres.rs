//! PostgreSQL-based store implementation.

use crate::error::{StoreError, StoreResult};
use crate::models::{SessionRow, TaskRow, UserRow};
use crate::reclaim::Reclaimer;
use crate::repos::{SessionRepo, TaskRepo, UserRepo};
use crate::store::{DocketStore, reclaim_after_soft_delete};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    reclaimer: Reclaimer,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn new(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
        reclaim_queue_capacity: usize,
    ) -> StoreResult<Self> {
        let mut opts = PgConnectOptions::from_str(url)?;

        // A server-side statement_timeout turns hung queries into Timeout
        // errors instead of stuck connections.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            reclaimer: Reclaimer::new(reclaim_queue_capacity),
        };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the reclaimer.
    pub fn reclaimer(&self) -> &Reclaimer {
        &self.reclaimer
    }
}

#[async_trait]
impl DocketStore for PostgresStore {
    async fn migrate(&self) -> StoreResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared
        // statement, so the schema is split and executed statement by statement.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepo for PostgresStore {
    async fn create_task(&self, task: &TaskRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (task_id, title, description, status, user_id, deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_active_tasks(&self, owner_id: Uuid) -> StoreResult<Vec<TaskRow>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE user_id = $1 AND deleted = FALSE ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_task(&self, task: &TaskRow) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE tasks SET title = $1, description = $2, status = $3, updated_at = $4 WHERE task_id = $5",
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
        let result = sqlx::query(
            "UPDATE tasks SET deleted = TRUE, updated_at = $1 WHERE task_id = $2 AND deleted = FALSE",
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
impl UserRepo for PostgresStore {
    async fn create_user(&self, user: &UserRow) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
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
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_user(&self, user: &UserRow) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET username = $1, email = $2, password_hash = $3, role = $4, updated_at = $5 WHERE user_id = $6",
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
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
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
impl SessionRepo for PostgresStore {
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, token_hash, created_at, expires_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6)
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
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn touch_session(&self, session_id: Uuid, used_at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET last_used_at = $1 WHERE session_id = $2")
            .bind(used_at)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
