//! Identifier types used throughout livesync.

use crate::{Error, UpdateKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a record in the authoritative source.
///
/// Remote sources hand out either numeric or string keys, so both are
/// representable. `Int(1)` and `Str("1")` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric key.
    Int(i64),
    /// String key (UUIDs, slugs, ...).
    Str(String),
}

impl RecordId {
    /// Reads a record id out of a JSON value.
    ///
    /// Accepts integers and strings; anything else is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| Error::InvalidId(n.to_string())),
            serde_json::Value::String(s) => Ok(Self::Str(s.clone())),
            other => Err(Error::InvalidId(other.to_string())),
        }
    }

    /// Converts back into the JSON representation.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Str(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Unique token identifying one pending update.
///
/// Rendered as `{kind}-{record_id}-{created_ms}-{seq}`. The sequence number
/// keeps two edits of the same record within one millisecond distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateId(String);

impl UpdateId {
    /// Derives an update id from its parts.
    #[must_use]
    pub fn derive(kind: UpdateKind, record_id: &RecordId, created_ms: i64, seq: u64) -> Self {
        Self(format!("{kind}-{record_id}-{created_ms}-{seq}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UpdateId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for UpdateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
