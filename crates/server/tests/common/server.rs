//! Server test utilities.

use docket_core::config::{AppConfig, StoreConfig};
use docket_server::{AppState, create_router};
use docket_store::{DocketStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server backed by a temporary SQLite database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("docket.db");

        let mut config = AppConfig::for_testing();
        config.store = StoreConfig::Sqlite {
            path: db_path.clone(),
        };
        modifier(&mut config);

        let store = Arc::new(
            SqliteStore::new(&db_path, config.reclaim.queue_capacity)
                .await
                .expect("Failed to create store"),
        ) as Arc<dyn DocketStore>;

        let state = AppState::new(config, store);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying store.
    pub fn store(&self) -> Arc<dyn DocketStore> {
        self.state.store.clone()
    }
}
