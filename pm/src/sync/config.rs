//! Sync engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::registry::OverlayKeying;

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SyncConfig {
    /// Channel buffer size for control requests
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Channel buffer size for fetch completions
    #[serde(default = "default_completion_buffer")]
    pub completion_buffer: usize,

    /// Upper bound on a single data fetch, in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// How presentation keys are derived from backends
    #[serde(default)]
    pub overlay_key: OverlayKeying,

    /// Abort in-flight fetches whose registration was replaced or removed
    #[serde(default)]
    pub abort_superseded: bool,
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    1000
}

fn default_completion_buffer() -> usize {
    debug!("default_completion_buffer: called");
    256
}

fn default_fetch_timeout_ms() -> u64 {
    debug!("default_fetch_timeout_ms: called");
    30_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        debug!("SyncConfig::default: called");
        Self {
            channel_buffer: 1000,
            completion_buffer: 256,
            fetch_timeout_ms: 30_000,
            overlay_key: OverlayKeying::DisplayName,
            abort_superseded: false,
        }
    }
}

impl SyncConfig {
    /// Get the fetch timeout as a Duration
    pub fn fetch_timeout(&self) -> Duration {
        debug!(fetch_timeout_ms = %self.fetch_timeout_ms, "SyncConfig::fetch_timeout: called");
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.channel_buffer, 1000);
        assert_eq!(config.completion_buffer, 256);
        assert_eq!(config.fetch_timeout_ms, 30_000);
        assert_eq!(config.overlay_key, OverlayKeying::DisplayName);
        assert!(!config.abort_superseded);
    }

    #[test]
    fn test_fetch_timeout_duration() {
        let config = SyncConfig {
            fetch_timeout_ms: 1500,
            ..Default::default()
        };
        assert_eq!(config.fetch_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: SyncConfig = serde_yaml::from_str("overlay-key: backend-id\nabort-superseded: true\n").unwrap();
        assert_eq!(config.overlay_key, OverlayKeying::BackendId);
        assert!(config.abort_superseded);
        assert_eq!(config.fetch_timeout_ms, 30_000);
        assert_eq!(config.channel_buffer, 1000);
    }
}
