//! Application state shared across handlers.

use docket_core::config::AppConfig;
use docket_store::DocketStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Persistence backend.
    pub store: Arc<dyn DocketStore>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, store: Arc<dyn DocketStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
