//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Mark the session cookie as Secure (HTTPS-only deployments).
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            secure_cookies: false,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// SQLite storage (single-node and test deployments).
    Sqlite {
        /// Path to the database file.
        path: PathBuf,
    },
    /// PostgreSQL storage.
    Postgres {
        /// Connection URL.
        url: String,
        /// Maximum pool connections.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Server-side statement timeout in milliseconds.
        /// A timed-out statement surfaces as a storage timeout, never NotFound.
        statement_timeout_ms: Option<u64>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/docket.db"),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

/// Session configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl SessionConfig {
    /// Get the session lifetime as a Duration.
    pub fn ttl(&self) -> time::Duration {
        let secs = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        time::Duration::seconds(secs)
    }
}

fn default_session_ttl_secs() -> u64 {
    crate::DEFAULT_SESSION_TTL_SECS
}

/// Reclamation (deferred hard-delete) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReclaimConfig {
    /// Capacity of the soft-delete signal queue. When the queue saturates, all
    /// tombstoned rows are purged in one transaction.
    #[serde(default = "default_reclaim_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_reclaim_queue_capacity(),
        }
    }
}

impl ReclaimConfig {
    /// Validate the reclamation configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("reclaim.queue_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_reclaim_queue_capacity() -> usize {
    crate::DEFAULT_RECLAIM_QUEUE_CAPACITY
}

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub reclaim: ReclaimConfig,
}

impl AppConfig {
    /// Create a configuration with test-friendly defaults.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.session.ttl_secs, 3600);
        assert_eq!(config.reclaim.queue_capacity, 10);
        assert!(config.reclaim.validate().is_ok());
    }

    #[test]
    fn zero_queue_capacity_rejected() {
        let reclaim = ReclaimConfig { queue_capacity: 0 };
        assert!(reclaim.validate().is_err());
    }

    #[test]
    fn store_config_is_tagged() {
        let config: StoreConfig = serde_json::from_value(serde_json::json!({
            "type": "postgres",
            "url": "postgres://localhost/docket",
        }))
        .unwrap();
        match config {
            StoreConfig::Postgres {
                url,
                max_connections,
                statement_timeout_ms,
            } => {
                assert_eq!(url, "postgres://localhost/docket");
                assert_eq!(max_connections, 10);
                assert!(statement_timeout_ms.is_none());
            }
            other => panic!("expected postgres config, got {other:?}"),
        }
    }

    #[test]
    fn session_ttl_duration() {
        let session = SessionConfig { ttl_secs: 120 };
        assert_eq!(session.ttl(), time::Duration::seconds(120));
    }
}
