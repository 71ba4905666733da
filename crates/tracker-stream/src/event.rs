//! Binary stream record.
//!
//! Mirrors `proto/tracking_event.proto`. Absent optional record fields are
//! encoded as the protobuf defaults.

use prost::Message;
use tracker_core::{TrackerError, TrackerResult, TrackingRecord};

/// Record appended to the downstream stream.
#[derive(Clone, PartialEq, Message)]
pub struct TrackingEvent {
    #[prost(string, tag = "1")]
    pub programid: String,
    #[prost(string, tag = "2")]
    pub checksum: String,
    #[prost(int32, tag = "3")]
    pub customer_id: i32,
    #[prost(string, tag = "4")]
    pub user_agent: String,
    #[prost(string, tag = "5")]
    pub program_name: String,
    #[prost(string, tag = "6")]
    pub customer_name: String,
    #[prost(bool, tag = "7")]
    pub is_valid: bool,
    #[prost(string, tag = "8")]
    pub message_id: String,
}

impl TrackingEvent {
    /// Serializes to the wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> TrackerResult<Self> {
        Self::decode(bytes).map_err(|e| TrackerError::decode(format!("Invalid tracking event: {}", e)))
    }
}

impl From<&TrackingRecord> for TrackingEvent {
    fn from(record: &TrackingRecord) -> Self {
        Self {
            programid: record.program_id.clone(),
            checksum: record.checksum.clone().unwrap_or_default(),
            customer_id: record.customer_id.unwrap_or_default(),
            user_agent: record.user_agent.clone().unwrap_or_default(),
            program_name: record.program_name.clone().unwrap_or_default(),
            customer_name: record.customer_name.clone().unwrap_or_default(),
            is_valid: record.valid,
            message_id: record.message_id.clone().unwrap_or_default(),
        }
    }
}

/// Partition key for a record: its message id, or the program id when the
/// record carries none.
#[must_use]
pub fn partition_key(record: &TrackingRecord) -> &str {
    record
        .message_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(&record.program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TrackingRecord {
        TrackingRecord {
            program_name: Some("myProgram".to_string()),
            checksum: Some("check123".to_string()),
            customer_id: Some(1234),
            customer_name: Some("myCustomer".to_string()),
            user_agent: Some("myUserAgent".to_string()),
            valid: true,
            ..TrackingRecord::new("12345").with_message_id("messageId")
        }
    }

    #[test]
    fn test_field_mapping() {
        let event = TrackingEvent::from(&record());
        assert_eq!(event.programid, "12345");
        assert_eq!(event.customer_id, 1234);
        assert_eq!(event.user_agent, "myUserAgent");
        assert!(event.is_valid);
        assert_eq!(event.message_id, "messageId");
    }

    #[test]
    fn test_wire_tags() {
        let event = TrackingEvent {
            programid: "a".to_string(),
            customer_id: 1,
            is_valid: true,
            ..TrackingEvent::default()
        };
        // field 1 (len-delimited) "a", field 3 varint 1, field 7 varint 1
        assert_eq!(event.to_bytes(), vec![0x0a, 0x01, b'a', 0x18, 0x01, 0x38, 0x01]);
    }

    #[test]
    fn test_decodes_what_it_encodes() {
        let event = TrackingEvent::from(&record());
        assert_eq!(TrackingEvent::from_bytes(&event.to_bytes()).unwrap(), event);
        assert!(TrackingEvent::from_bytes(&[0xff, 0xff]).is_err());
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        let event = TrackingEvent::from(&TrackingRecord::new("1"));
        assert_eq!(event.customer_id, 0);
        assert!(event.checksum.is_empty());
        assert!(!event.is_valid);
    }

    #[test]
    fn test_partition_key_prefers_message_id() {
        assert_eq!(partition_key(&record()), "messageId");
        assert_eq!(partition_key(&TrackingRecord::new("42")), "42");
        assert_eq!(partition_key(&TrackingRecord::new("42").with_message_id("")), "42");
    }
}
