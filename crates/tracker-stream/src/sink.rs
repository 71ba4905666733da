//! Append-only sinks for encoded stream records.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracker_core::{TrackerError, TrackerResult};

/// A downstream append-only stream.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Appends one record under a partition key and returns the
    /// sequence id the stream assigned to it.
    async fn append(&self, stream: &str, partition_key: &str, data: Vec<u8>) -> TrackerResult<String>;
}

/// One record captured by [`InMemoryEventSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedEvent {
    pub stream: String,
    pub partition_key: String,
    pub data: Vec<u8>,
}

/// Sink that keeps appends in memory.
///
/// Used when the stream is disabled and in tests.
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<AppendedEvent>>,
    failing: AtomicBool,
}

impl InMemoryEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later append fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn events(&self) -> Vec<AppendedEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn append(&self, stream: &str, partition_key: &str, data: Vec<u8>) -> TrackerResult<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TrackerError::Publish(format!("stream {} rejected the append", stream)));
        }

        let mut events = self.events.lock();
        events.push(AppendedEvent {
            stream: stream.to_string(),
            partition_key: partition_key.to_string(),
            data,
        });
        Ok(format!("{}-0", events.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_ids_increase() {
        let sink = InMemoryEventSink::new();
        assert_eq!(sink.append("s", "k", vec![1]).await.unwrap(), "1-0");
        assert_eq!(sink.append("s", "k", vec![2]).await.unwrap(), "2-0");
        assert_eq!(sink.events()[1].data, vec![2]);
    }

    #[tokio::test]
    async fn test_failing_sink_keeps_nothing() {
        let sink = InMemoryEventSink::new();
        sink.set_failing(true);
        let err = sink.append("s", "k", vec![1]).await.unwrap_err();
        assert!(matches!(err, TrackerError::Publish(_)));
        assert!(sink.is_empty());
    }
}
