//! Dispatcher-facing stream publisher.

use crate::{partition_key, EventSink, TrackingEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use tracker_bus::{BusError, Dispatcher, Handler, Message};
use tracker_core::addresses::STREAM_PUBLISH;
use tracker_core::metrics::StreamMetrics;
use tracker_core::TrackingRecord;

/// Encodes published records and appends them to the stream.
///
/// At most `max_in_flight` appends run at once. When every permit is taken
/// the handler loop waits, so publishers back up on the inbox instead of
/// spawning without bound. Appends are not ordered relative to each other.
pub struct PublisherHandler {
    sink: Arc<dyn EventSink>,
    stream: String,
    permits: Arc<Semaphore>,
}

impl PublisherHandler {
    pub fn new(sink: Arc<dyn EventSink>, stream: impl Into<String>, max_in_flight: usize) -> Self {
        Self {
            sink,
            stream: stream.into(),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Creates the handler and binds it to the publish address.
    pub fn bind(
        sink: Arc<dyn EventSink>,
        stream: impl Into<String>,
        max_in_flight: usize,
        dispatcher: &Dispatcher,
    ) -> Result<(), BusError> {
        dispatcher.bind(&[STREAM_PUBLISH], Arc::new(Self::new(sink, stream, max_in_flight)))
    }
}

#[async_trait]
impl Handler for PublisherHandler {
    fn name(&self) -> &'static str {
        "stream-publisher"
    }

    async fn handle(&self, message: Message) {
        let record = match TrackingRecord::from_document(message.body()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable publish");
                message.fail(BusError::Codec(e.to_string()));
                return;
            }
        };

        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            message.fail(BusError::ShuttingDown);
            return;
        };

        let key = partition_key(&record).to_string();
        let data = TrackingEvent::from(&record).to_bytes();
        let sink = self.sink.clone();
        let stream = self.stream.clone();
        let (_, _, replier) = message.into_parts();

        tokio::spawn(async move {
            let _permit = permit;
            match sink.append(&stream, &key, data).await {
                Ok(sequence) => {
                    StreamMetrics::appended(&stream);
                    debug!(stream = %stream, partition_key = %key, sequence = %sequence, "Record published");
                    replier.reply(serde_json::Value::String(sequence));
                }
                Err(e) => {
                    StreamMetrics::failed(&stream);
                    warn!(stream = %stream, partition_key = %key, error = %e, "Publish failed");
                    replier.fail(BusError::Failed(e.to_string()));
                }
            }
        });
    }
}
