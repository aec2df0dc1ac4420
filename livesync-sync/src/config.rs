//! Configuration for the sync components.
//!
//! Every section has serde defaults so a config file only needs the keys it
//! wants to change.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Refresh period used when none (or a non-positive one) is configured: 30 minutes.
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 1_800_000;

/// How long an optimistic update stays in the overlay without confirmation.
pub const DEFAULT_UPDATE_TTL_MS: u64 = 5_000;

/// Overlay store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Time-to-live of a pending update (ms).
    pub ttl_ms: u64,
}

impl OverlayConfig {
    /// The TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_UPDATE_TTL_MS,
        }
    }
}

/// Sync scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Refresh period (ms). Zero or negative selects the default.
    pub interval_ms: i64,
    /// Whether periodic and visibility refreshes are installed at all.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SYNC_INTERVAL_MS as i64,
            enabled: true,
        }
    }
}

/// Realtime bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Topic (resource collection) to subscribe to.
    pub topic: String,
    /// Whether to subscribe.
    pub enabled: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            topic: "records".to_string(),
            enabled: true,
        }
    }
}

/// Top-level configuration bundling all components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSyncConfig {
    pub overlay: OverlayConfig,
    pub scheduler: SchedulerConfig,
    pub realtime: RealtimeConfig,
}

impl LiveSyncConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects configurations the components cannot run with.
    ///
    /// A non-positive interval is not an error; the scheduler falls back to
    /// the default period.
    pub fn validate(&self) -> SyncResult<()> {
        if self.realtime.enabled && self.realtime.topic.trim().is_empty() {
            return Err(SyncError::Config(
                "realtime.topic must not be empty when realtime is enabled".into(),
            ));
        }
        if self.overlay.ttl_ms == 0 {
            return Err(SyncError::Config("overlay.ttl_ms must be positive".into()));
        }
        Ok(())
    }
}
