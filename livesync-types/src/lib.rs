//! Core type definitions for livesync.
//!
//! This crate defines the record model shared by the sync engine:
//! - Record identifiers (integer or string, as remote sources hand them out)
//! - The `Record` trait and a JSON-object implementation
//! - Pending optimistic updates and their identifiers
//!
//! Nothing here does I/O or scheduling; timers and transports live in
//! `livesync-sync`.

mod ids;
mod record;
mod update;

pub use ids::{RecordId, UpdateId};
pub use record::{JsonRecord, Record};
pub use update::{PendingUpdate, UpdateKind};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no `id` field")]
    MissingId,

    #[error("invalid record id: {0}")]
    InvalidId(String),
}
