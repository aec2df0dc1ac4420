//! Pending optimistic updates.
//!
//! A pending update is a local mutation shown to the user before the
//! authoritative source confirms it. Updates are immutable once created;
//! the overlay only ever appends or removes them.

use crate::{Record, RecordId, UpdateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// A record was created locally.
    Create,
    /// Some fields of an existing record were changed locally.
    Update,
    /// A record was deleted locally.
    Delete,
}

impl UpdateKind {
    /// Lowercase name used in update ids and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One not-yet-confirmed local mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdate<R> {
    id: UpdateId,
    kind: UpdateKind,
    payload: R,
    created_at: DateTime<Utc>,
}

impl<R: Record> PendingUpdate<R> {
    /// Creates a pending update stamped with `created_at`.
    ///
    /// `seq` disambiguates updates of the same record created within the
    /// same millisecond.
    #[must_use]
    pub fn new(kind: UpdateKind, payload: R, created_at: DateTime<Utc>, seq: u64) -> Self {
        let id = UpdateId::derive(kind, &payload.id(), created_at.timestamp_millis(), seq);
        Self {
            id,
            kind,
            payload,
            created_at,
        }
    }

    /// The id of the record this update targets.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        self.payload.id()
    }
}

impl<R> PendingUpdate<R> {
    /// Unique id of this update.
    #[must_use]
    pub fn id(&self) -> &UpdateId {
        &self.id
    }

    /// Kind of mutation.
    #[must_use]
    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    /// Full or partial record carried by the update.
    #[must_use]
    pub fn payload(&self) -> &R {
        &self.payload
    }

    /// When the update was recorded.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
