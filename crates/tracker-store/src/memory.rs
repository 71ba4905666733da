//! In-memory record store.
//!
//! Used when Redis is disabled and as a test double. Availability can be
//! toggled to simulate an outage.

use crate::RecordStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracker_core::{TrackerError, TrackerResult, TrackingRecord};

#[derive(Debug)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, TrackingRecord>>,
    available: AtomicBool,
    fetches: AtomicUsize,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Creates a store seeded with records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = TrackingRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                map.insert(record.program_id.clone(), strip(record));
            }
        }
        store
    }

    /// Simulates losing or regaining the connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of fetch calls seen, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check(&self) -> TrackerResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TrackerError::StoreUnavailable("in-memory store is offline".to_string()))
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops the request-scoped message id, matching what the hash encoding keeps.
fn strip(mut record: TrackingRecord) -> TrackingRecord {
    record.message_id = None;
    record
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(&self, program_id: &str) -> TrackerResult<Option<TrackingRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.records.read().get(program_id).cloned())
    }

    async fn store(&self, record: &TrackingRecord) -> TrackerResult<()> {
        self.check()?;
        self.records
            .write()
            .insert(record.program_id.clone(), strip(record.clone()));
        Ok(())
    }

    async fn delete(&self, program_id: &str) -> TrackerResult<bool> {
        self.check()?;
        Ok(self.records.write().remove(program_id).is_some())
    }

    async fn flush_all(&self) -> TrackerResult<()> {
        self.check()?;
        self.records.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_fetch_delete() {
        let store = InMemoryRecordStore::new();
        let record = TrackingRecord::new("1").with_message_id("m1");
        store.store(&record).await.unwrap();

        let fetched = store.fetch("1").await.unwrap().unwrap();
        assert!(fetched.message_id.is_none());

        assert!(store.delete("1").await.unwrap());
        assert!(!store.delete("1").await.unwrap());
        assert!(store.fetch("1").await.unwrap().is_none());
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_store_replaces_previous_record() {
        let store = InMemoryRecordStore::new();
        store
            .store(&TrackingRecord {
                checksum: Some("check123".to_string()),
                customer_id: Some(1234),
                valid: true,
                ..TrackingRecord::new("1")
            })
            .await
            .unwrap();
        store.store(&TrackingRecord::new("1")).await.unwrap();

        let fetched = store.fetch("1").await.unwrap().unwrap();
        assert!(fetched.checksum.is_none());
        assert!(fetched.customer_id.is_none());
        assert!(!fetched.valid);
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = InMemoryRecordStore::with_records([TrackingRecord::new("1")]);
        store.set_available(false);

        let err = store.fetch("1").await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.flush_all().await.is_err());

        store.set_available(true);
        store.flush_all().await.unwrap();
        assert!(store.is_empty());
    }
}
