//! Amazon Kinesis Data Streams sink.

use crate::EventSink;
use async_trait::async_trait;
use aws_sdk_kinesis::config::{BehaviorVersion, Region};
use aws_sdk_kinesis::error::DisplayErrorContext;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::Client;
use tracing::debug;
use tracker_config::StreamConfig;
use tracker_core::{TrackerError, TrackerResult};

/// Appends records to a Kinesis stream with `PutRecord`.
///
/// Credentials come from the default AWS provider chain. The region is
/// always the configured one, and `stream.url` overrides the endpoint.
#[derive(Clone, Debug)]
pub struct KinesisEventSink {
    client: Client,
}

impl KinesisEventSink {
    pub async fn new(config: &StreamConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(url) = &config.url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;

        Self::from_client(Client::new(&sdk_config))
    }

    /// Wraps an already configured client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Region the client signs requests for.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|region| region.as_ref())
    }
}

#[async_trait]
impl EventSink for KinesisEventSink {
    async fn append(&self, stream: &str, partition_key: &str, data: Vec<u8>) -> TrackerResult<String> {
        let output = self
            .client
            .put_record()
            .stream_name(stream)
            .partition_key(partition_key)
            .data(Blob::new(data))
            .send()
            .await
            .map_err(|e| {
                TrackerError::Publish(format!("PutRecord {} failed: {}", stream, DisplayErrorContext(&e)))
            })?;

        let sequence = output.sequence_number().to_string();
        debug!(stream, partition_key, shard = output.shard_id(), sequence = %sequence, "Appended stream record");
        Ok(sequence)
    }
}
