//! Message documents exchanged over the dispatcher.
//!
//! Bodies are JSON-like values. An empty object is the not-found sentinel
//! used by the resolve path.

use crate::{TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message body.
pub type Document = Value;

/// Returns the not-found sentinel, an empty document.
#[must_use]
pub fn not_found() -> Document {
    Value::Object(Map::new())
}

/// Checks whether a reply is the not-found sentinel.
///
/// `null` is treated the same way so a handler that replies with nothing
/// never gets mistaken for a record.
#[must_use]
pub fn is_not_found(document: &Document) -> bool {
    match document {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Request to resolve a program id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub program_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl ResolveRequest {
    #[must_use]
    pub fn new(program_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            message_id: Some(message_id.into()),
        }
    }

    /// Decodes and validates a resolve request.
    pub fn from_document(document: &Document) -> TrackerResult<Self> {
        let request = Self::deserialize(document)?;
        if request.program_id.trim().is_empty() {
            return Err(TrackerError::validation("programId is required"));
        }
        Ok(request)
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut map = Map::new();
        map.insert("programId".into(), Value::String(self.program_id.clone()));
        if let Some(message_id) = &self.message_id {
            map.insert("messageId".into(), Value::String(message_id.clone()));
        }
        Value::Object(map)
    }
}

/// Request to remove a program id from the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub program_id: String,
}

impl DeleteRequest {
    #[must_use]
    pub fn new(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
        }
    }

    pub fn from_document(document: &Document) -> TrackerResult<Self> {
        let request = Self::deserialize(document)?;
        if request.program_id.trim().is_empty() {
            return Err(TrackerError::validation("programId is required"));
        }
        Ok(request)
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut map = Map::new();
        map.insert("programId".into(), Value::String(self.program_id.clone()));
        Value::Object(map)
    }
}

/// Reply to a [`DeleteRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub program_id: String,
    /// Whether a key was actually removed.
    pub deleted: bool,
}

impl DeleteOutcome {
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut map = Map::new();
        map.insert("programId".into(), Value::String(self.program_id.clone()));
        map.insert("deleted".into(), Value::Bool(self.deleted));
        Value::Object(map)
    }
}
