//! The record model.
//!
//! The engine never looks inside a record beyond its id. Field-level
//! behavior is limited to the shallow patch used by `Update` overlays.

use crate::{Error, RecordId, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Any entity with a stable unique identifier.
pub trait Record: Clone {
    /// The record's identifier.
    fn id(&self) -> RecordId;

    /// Shallow-merges `patch` into `self`.
    ///
    /// Fields present in `patch` overwrite the existing ones; fields absent
    /// from `patch` are kept.
    fn merge_patch(&mut self, patch: &Self);
}

/// A record backed by a JSON object with an integer or string `id` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct JsonRecord {
    id: RecordId,
    fields: Map<String, Value>,
}

impl JsonRecord {
    /// Name of the identifier field.
    pub const ID_FIELD: &'static str = "id";

    /// Builds a record from a JSON value.
    ///
    /// Fails if the value is not an object or its `id` is missing or is
    /// neither an integer nor a string.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Self::from_map(fields),
            _ => Err(Error::NotAnObject),
        }
    }

    /// Builds a record from an already-parsed JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        let id = fields
            .get(Self::ID_FIELD)
            .ok_or(Error::MissingId)
            .and_then(RecordId::from_json)?;
        Ok(Self { id, fields })
    }

    /// Parses a record from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Creates a record holding only its id. Useful as a delete payload.
    #[must_use]
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        let id = id.into();
        let mut fields = Map::new();
        fields.insert(Self::ID_FIELD.to_string(), id.to_json());
        Self { id, fields }
    }

    /// Returns a field's value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, returning the record for chaining.
    ///
    /// The `id` field cannot be changed through this method.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        if field != Self::ID_FIELD {
            self.fields.insert(field, value.into());
        }
        self
    }

    /// All fields, including `id`.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the record back into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Record for JsonRecord {
    fn id(&self) -> RecordId {
        self.id.clone()
    }

    fn merge_patch(&mut self, patch: &Self) {
        for (key, value) in &patch.fields {
            if key == Self::ID_FIELD {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

impl TryFrom<Value> for JsonRecord {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<JsonRecord> for Value {
    fn from(record: JsonRecord) -> Self {
        record.into_value()
    }
}
