//! Runtime configuration for the state layer.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::SearchOptions;

/// Default toast lifetime when a caller does not pass one.
pub const DEFAULT_TOAST_MS: i64 = 3000;
/// Delay between hiding the player and dropping its session data.
pub const DEFAULT_CLOSE_GRACE_MS: u64 = 300;

/// Top-level ClipSage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSageConfig {
    /// Lifetime applied by the toast convenience helpers.
    pub toast_lifetime_ms: i64,
    /// Grace delay before a closed player clears its session.
    pub close_grace_ms: u64,
    /// Per-request timeout on the IPC gateway.
    pub ipc_timeout_secs: u64,
    /// Buffer size of the state-change broadcast channel.
    pub event_capacity: usize,
    /// Baseline search options restored by `SearchStore::reset`.
    pub search_defaults: SearchOptions,
    /// JSON catalog used by the demo backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,
}

impl Default for ClipSageConfig {
    fn default() -> Self {
        Self {
            toast_lifetime_ms: DEFAULT_TOAST_MS,
            close_grace_ms: DEFAULT_CLOSE_GRACE_MS,
            ipc_timeout_secs: 120,
            event_capacity: 256,
            search_defaults: SearchOptions::default(),
            fixture_path: None,
        }
    }
}

impl ClipSageConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut search_defaults = defaults.search_defaults.clone();
        search_defaults.top_k = env_or("CLIPSAGE_TOP_K", search_defaults.top_k);
        search_defaults.use_cascaded_reranking =
            env_or("CLIPSAGE_RERANK", search_defaults.use_cascaded_reranking);

        Self {
            toast_lifetime_ms: env_or("CLIPSAGE_TOAST_MS", defaults.toast_lifetime_ms),
            close_grace_ms: env_or("CLIPSAGE_CLOSE_GRACE_MS", defaults.close_grace_ms),
            ipc_timeout_secs: env_or("CLIPSAGE_IPC_TIMEOUT_SECS", defaults.ipc_timeout_secs),
            event_capacity: env_or("CLIPSAGE_EVENT_CAPACITY", defaults.event_capacity).max(1),
            search_defaults,
            fixture_path: std::env::var("CLIPSAGE_FIXTURE").ok().map(PathBuf::from),
        }
    }

    /// Reject values the state layer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ipc_timeout_secs == 0 {
            return Err(Error::Config("IPC timeout must be at least 1 second".into()));
        }
        if self.search_defaults.top_k == 0 {
            return Err(Error::Config("default top_k must be positive".into()));
        }
        if let Some(path) = &self.fixture_path {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "fixture {} is not a readable file",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn ipc_timeout(&self) -> Duration {
        Duration::from_secs(self.ipc_timeout_secs)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClipSageConfig::default();
        assert_eq!(config.toast_lifetime_ms, 3000);
        assert_eq!(config.close_grace(), Duration::from_millis(300));
        assert_eq!(config.search_defaults.top_k, 10);
        assert!(config.fixture_path.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ClipSageConfig::default().validate().is_ok());

        let no_timeout = ClipSageConfig {
            ipc_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(no_timeout.validate(), Err(Error::Config(_))));

        let missing_fixture = ClipSageConfig {
            fixture_path: Some(PathBuf::from("/nonexistent/clipsage/catalog.json")),
            ..Default::default()
        };
        let err = missing_fixture.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("catalog.json"));

        let fixture = tempfile::NamedTempFile::new().unwrap();
        let present = ClipSageConfig {
            fixture_path: Some(fixture.path().to_path_buf()),
            ..Default::default()
        };
        assert!(present.validate().is_ok());
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("CLIPSAGE_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("CLIPSAGE_TEST_GARBAGE", 7u64), 7);
        std::env::set_var("CLIPSAGE_TEST_GOOD", " 42 ");
        assert_eq!(env_or("CLIPSAGE_TEST_GOOD", 7u64), 42);
        assert_eq!(env_or("CLIPSAGE_TEST_UNSET_KEY", false), false);
    }
}
