//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Push transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport refused a channel subscription.
    #[error("subscription to topic {topic} rejected: {reason}")]
    SubscriptionRejected { topic: String, reason: String },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No tokio runtime is available to host timers or listeners.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (config files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record.
    #[error("record error: {0}")]
    Record(#[from] livesync_types::Error),
}
