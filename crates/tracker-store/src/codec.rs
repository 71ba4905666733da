//! Hash-field encoding of tracking records.
//!
//! One hash per program id. Absent optional fields are not written,
//! `customerId` is a decimal string and `valid` is `true`/`false`. The
//! message id is request-scoped and never stored.

use std::collections::HashMap;
use tracker_core::{TrackerError, TrackerResult, TrackingRecord};

pub const FIELD_USER_AGENT: &str = "userAgent";
pub const FIELD_PROGRAM_ID: &str = "programId";
pub const FIELD_PROGRAM_NAME: &str = "programName";
pub const FIELD_CHECKSUM: &str = "checksum";
pub const FIELD_CUSTOMER_ID: &str = "customerId";
pub const FIELD_CUSTOMER_NAME: &str = "customerName";
pub const FIELD_VALID: &str = "valid";

/// Encodes a record into hash fields.
#[must_use]
pub fn encode_fields(record: &TrackingRecord) -> Vec<(&'static str, String)> {
    let mut fields = Vec::with_capacity(7);
    if let Some(user_agent) = &record.user_agent {
        fields.push((FIELD_USER_AGENT, user_agent.clone()));
    }
    fields.push((FIELD_PROGRAM_ID, record.program_id.clone()));
    if let Some(program_name) = &record.program_name {
        fields.push((FIELD_PROGRAM_NAME, program_name.clone()));
    }
    if let Some(checksum) = &record.checksum {
        fields.push((FIELD_CHECKSUM, checksum.clone()));
    }
    if let Some(customer_id) = record.customer_id {
        fields.push((FIELD_CUSTOMER_ID, customer_id.to_string()));
    }
    if let Some(customer_name) = &record.customer_name {
        fields.push((FIELD_CUSTOMER_NAME, customer_name.clone()));
    }
    fields.push((FIELD_VALID, record.valid.to_string()));
    fields
}

/// Rebuilds a record from hash fields. Unknown fields are ignored.
///
/// # Errors
///
/// `Decode` when `programId` is missing or a typed field does not parse.
pub fn decode_fields(fields: &HashMap<String, String>) -> TrackerResult<TrackingRecord> {
    let program_id = fields
        .get(FIELD_PROGRAM_ID)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| TrackerError::decode("stored record has no programId"))?;

    let customer_id = fields
        .get(FIELD_CUSTOMER_ID)
        .map(|raw| {
            raw.trim()
                .parse::<i32>()
                .map_err(|_| TrackerError::decode(format!("invalid customerId '{}'", raw)))
        })
        .transpose()?;

    let valid = match fields.get(FIELD_VALID).map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) if v == "true" || v == "1" => true,
        Some(v) if v == "false" || v == "0" || v.is_empty() => false,
        Some(v) => return Err(TrackerError::decode(format!("invalid valid flag '{}'", v))),
    };

    Ok(TrackingRecord {
        program_id: program_id.clone(),
        program_name: fields.get(FIELD_PROGRAM_NAME).cloned(),
        message_id: None,
        checksum: fields.get(FIELD_CHECKSUM).cloned(),
        customer_id,
        customer_name: fields.get(FIELD_CUSTOMER_NAME).cloned(),
        user_agent: fields.get(FIELD_USER_AGENT).cloned(),
        valid,
    })
}
