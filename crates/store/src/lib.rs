//! Persistence layer for docket.
//!
//! This crate provides the data model and its storage backends:
//! - Users, tasks, and server-side sessions
//! - Tombstone-based soft delete with deferred batched reclamation
//! - SQLite and PostgreSQL implementations behind a combined store trait

pub mod error;
pub mod models;
pub mod postgres;
pub mod reclaim;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use postgres::PostgresStore;
pub use reclaim::{ReclaimDecision, Reclaimer};
pub use repos::{SessionRepo, TaskRepo, UserRepo};
pub use store::{DocketStore, SqliteStore};

use docket_core::config::{ReclaimConfig, StoreConfig};
use std::sync::Arc;

/// Create a store from configuration.
pub async fn from_config(
    config: &StoreConfig,
    reclaim: &ReclaimConfig,
) -> StoreResult<Arc<dyn DocketStore>> {
    reclaim
        .validate()
        .map_err(|e| StoreError::Config(e.to_string()))?;

    match config {
        StoreConfig::Sqlite { path } => {
            let store = SqliteStore::new(path, reclaim.queue_capacity).await?;
            Ok(Arc::new(store) as Arc<dyn DocketStore>)
        }
        StoreConfig::Postgres {
            url,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = PostgresStore::new(
                url,
                *max_connections,
                *statement_timeout_ms,
                reclaim.queue_capacity,
            )
            .await?;
            Ok(Arc::new(store) as Arc<dyn DocketStore>)
        }
    }
}
