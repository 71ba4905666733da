//! Backing store abstraction.

use async_trait::async_trait;
use tracker_core::{TrackerResult, TrackingRecord};

/// Durable record storage keyed by program id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads a record. `Ok(None)` when the key does not exist.
    async fn fetch(&self, program_id: &str) -> TrackerResult<Option<TrackingRecord>>;

    /// Replaces the stored record with the non-transient fields of
    /// `record`. Fields absent from `record` do not survive.
    async fn store(&self, record: &TrackingRecord) -> TrackerResult<()>;

    /// Removes a record. Returns whether a key was removed.
    async fn delete(&self, program_id: &str) -> TrackerResult<bool>;

    /// Removes every record.
    async fn flush_all(&self) -> TrackerResult<()>;
}
