//! Task repository trait: tombstone lifecycle and reclamation.

use crate::error::StoreResult;
use crate::models::TaskRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for task records.
///
/// Reclamation is part of the contract, not an optional capability: every
/// backend must implement `purge_tombstoned`, so no implementation can
/// silently skip physical cleanup.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Persist a new task. The row arrives with `deleted = false` and a fresh
    /// id assigned by the caller.
    async fn create_task(&self, task: &TaskRow) -> StoreResult<()>;

    /// Get a task by id, tombstoned or not.
    ///
    /// Tombstoned rows are intentionally visible here: ownership verification
    /// and idempotency checks need to observe them until the purge runs.
    async fn get_task(&self, task_id: Uuid) -> StoreResult<Option<TaskRow>>;

    /// List the owner's tasks with `deleted = false`. An empty result is not
    /// an error at this layer.
    async fn list_active_tasks(&self, owner_id: Uuid) -> StoreResult<Vec<TaskRow>>;

    /// Overwrite title/description/status of an existing task. Fails with
    /// NotFound if no row has that id. Partial-update merging is the calling
    /// layer's job.
    async fn update_task(&self, task: &TaskRow) -> StoreResult<()>;

    /// Flip the tombstone flag. One atomic conditional update: exactly one of
    /// any concurrent callers succeeds; the rest get NotFound, which also
    /// covers rows that are absent or already tombstoned.
    ///
    /// On success the store notifies its reclaimer and, when the signal queue
    /// is saturated, runs `purge_tombstoned` synchronously. Purge failures
    /// are logged, never returned: the soft delete has already committed.
    async fn soft_delete_task(&self, task_id: Uuid) -> StoreResult<()>;

    /// Physically remove every tombstoned row in one transaction, returning
    /// the count removed. All-or-nothing: a failure after partial deletion
    /// rolls back entirely.
    async fn purge_tombstoned(&self) -> StoreResult<u64>;
}
