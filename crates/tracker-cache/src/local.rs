//! Moka-backed local record cache.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::info;
use tracker_core::TrackingRecord;

/// Local record storage keyed by program id.
#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Returns a copy of the cached record. Never performs external I/O.
    async fn get(&self, program_id: &str) -> Option<TrackingRecord>;

    /// Inserts or replaces the record, restarting its time to live.
    async fn put(&self, record: TrackingRecord);

    /// Drops every entry.
    async fn purge(&self);

    /// Approximate number of entries.
    fn entry_count(&self) -> u64;
}

/// Bounded in-memory cache with a write-based time to live.
///
/// Eviction follows moka's policy (TinyLFU admission, LRU eviction) once
/// `max_entries` is reached. Reads do not extend an entry's lifetime.
#[derive(Clone)]
pub struct LocalCache {
    inner: Cache<String, TrackingRecord>,
}

impl LocalCache {
    /// Default maximum entry count.
    pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;
    /// Default time to live.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    #[must_use]
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        info!(max_entries, ttl_secs = ttl.as_secs(), "Initializing local cache");
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    /// Flushes moka's pending maintenance, making `entry_count` exact.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ENTRIES, Self::DEFAULT_TTL)
    }
}

#[async_trait]
impl RecordCache for LocalCache {
    async fn get(&self, program_id: &str) -> Option<TrackingRecord> {
        self.inner.get(program_id).await
    }

    async fn put(&self, record: TrackingRecord) {
        self.inner.insert(record.program_id.clone(), record).await;
    }

    async fn purge(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
