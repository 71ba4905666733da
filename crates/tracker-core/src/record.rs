//! The tracking record, the unit of caching and transport.

use crate::{Document, TrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};

/// Enriched tracking record resolved for a program id.
///
/// Identity is the `program_id` alone: two records with the same program id
/// compare equal no matter what else they carry. Use [`same_content`] when
/// every field has to match.
///
/// `message_id` and `user_agent` are request-scoped decorations and are
/// never authoritative when read back from the backing store.
///
/// [`same_content`]: TrackingRecord::same_content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    /// Stable business identifier, the cache and store key.
    pub program_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    /// Per-request correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Optional content fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Set by the caller at resolution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub valid: bool,
}

impl TrackingRecord {
    /// Creates an empty record for a program id.
    #[must_use]
    pub fn new(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            ..Default::default()
        }
    }

    /// Sets the message id.
    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Decodes a record from a message document.
    ///
    /// Fails when the document is not a record or its program id is blank,
    /// so such a value never reaches the cache or the store.
    pub fn from_document(document: &Document) -> TrackerResult<Self> {
        let record = Self::deserialize(document)?;
        record.validate()?;
        Ok(record)
    }

    /// Decodes a record from a JSON string.
    pub fn from_json(json: &str) -> TrackerResult<Self> {
        let record: Self = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Checks the record can be stored or resolved.
    pub fn validate(&self) -> TrackerResult<()> {
        if self.program_id.trim().is_empty() {
            return Err(TrackerError::validation("programId is required"));
        }
        Ok(())
    }

    /// Encodes the record as a message document.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut map = Map::new();
        map.insert("programId".into(), Value::String(self.program_id.clone()));
        insert_opt(&mut map, "programName", self.program_name.as_deref());
        insert_opt(&mut map, "messageId", self.message_id.as_deref());
        insert_opt(&mut map, "checksum", self.checksum.as_deref());
        if let Some(customer_id) = self.customer_id {
            map.insert("customerId".into(), Value::from(customer_id));
        }
        insert_opt(&mut map, "customerName", self.customer_name.as_deref());
        insert_opt(&mut map, "userAgent", self.user_agent.as_deref());
        map.insert("valid".into(), Value::Bool(self.valid));
        Value::Object(map)
    }

    /// Compares every field, not only the identity.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.program_id == other.program_id
            && self.program_name == other.program_name
            && self.message_id == other.message_id
            && self.checksum == other.checksum
            && self.customer_id == other.customer_id
            && self.customer_name == other.customer_name
            && self.user_agent == other.user_agent
            && self.valid == other.valid
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(key.into(), Value::String(value.to_string()));
    }
}

impl PartialEq for TrackingRecord {
    fn eq(&self, other: &Self) -> bool {
        self.program_id == other.program_id
    }
}

impl Eq for TrackingRecord {}

impl Hash for TrackingRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.program_id.hash(state);
    }
}

impl std::fmt::Display for TrackingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TrackingRecord(programId={}, messageId={})",
            self.program_id,
            self.message_id.as_deref().unwrap_or("-")
        )
    }
}
