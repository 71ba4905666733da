//! Change-notification bridge from a Redis pub/sub channel to the cache.

use crate::{ConnectionLink, LinkState};
use futures::StreamExt;
use redis::aio::PubSub;
use redis::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracker_bus::Dispatcher;
use tracker_config::RedisConfig;
use tracker_core::addresses::CACHE_REFILL;
use tracker_core::metrics::StoreMetrics;
use tracker_core::{TrackerError, TrackerResult, TrackingRecord};
use tracker_resilience::{with_timeout, RetryPolicy};

/// Field of an envelope notification carrying the JSON-encoded record.
pub const ENVELOPE_FIELD: &str = "message";

/// Decodes a notification payload.
///
/// Accepts either a bare JSON record or an envelope object whose `message`
/// field holds the record, itself JSON-encoded as a string or inlined.
pub fn decode_notification(payload: &str) -> TrackerResult<TrackingRecord> {
    let value: Value = serde_json::from_str(payload)?;
    match value.get(ENVELOPE_FIELD) {
        Some(Value::String(inner)) => TrackingRecord::from_json(inner),
        Some(inner @ Value::Object(_)) => TrackingRecord::from_document(inner),
        Some(_) => Err(TrackerError::decode("envelope message is neither a string nor an object")),
        None => TrackingRecord::from_document(&value),
    }
}

/// Decodes a notification and sends the record to the cache refill address.
pub async fn forward_notification(dispatcher: &Dispatcher, payload: &str) -> TrackerResult<()> {
    StoreMetrics::notification();
    let record = decode_notification(payload)?;
    debug!(program_id = %record.program_id, "Forwarding change notification");
    dispatcher
        .send(CACHE_REFILL, record.to_document())
        .await
        .map_err(TrackerError::from)
}

/// Subscribes to one channel on a dedicated connection and forwards every
/// notification to the local cache.
pub struct PubSubBridge {
    client: Client,
    channel: String,
    dispatcher: Dispatcher,
    link: Arc<ConnectionLink>,
    policy: RetryPolicy,
    connect_timeout: Duration,
}

impl PubSubBridge {
    pub fn new(config: &RedisConfig, dispatcher: Dispatcher) -> TrackerResult<Self> {
        let client = Client::open(config.url())
            .map_err(|e| TrackerError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            channel: config.channel.clone(),
            dispatcher,
            link: Arc::new(ConnectionLink::new("subscriber")),
            policy: RetryPolicy::reconnect(config.reconnect_initial(), config.reconnect_max()),
            connect_timeout: config.connect_timeout(),
        })
    }

    /// The subscriber connection's state.
    #[must_use]
    pub fn link(&self) -> Arc<ConnectionLink> {
        self.link.clone()
    }

    /// Starts the subscribe loop.
    pub fn start(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    async fn run(self, token: CancellationToken) {
        let mut established_before = false;

        'connect: loop {
            self.link.set(LinkState::Connecting);

            let subscribe = self.policy.execute(|| self.subscribe());
            let mut pubsub = tokio::select! {
                () = token.cancelled() => break 'connect,
                result = subscribe => match result {
                    Ok(pubsub) => pubsub,
                    Err(e) => {
                        warn!(error = %e, "Subscribe attempts exhausted, starting over");
                        continue 'connect;
                    }
                },
            };

            self.link.set(LinkState::Connected);
            if established_before {
                StoreMetrics::reconnected("subscriber");
            }
            established_before = true;
            info!(channel = %self.channel, "Subscribed to change notifications");

            let mut messages = pubsub.on_message();
            loop {
                let message = tokio::select! {
                    () = token.cancelled() => break 'connect,
                    message = messages.next() => message,
                };
                let Some(message) = message else {
                    break;
                };

                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Ignoring non-text notification");
                        continue;
                    }
                };
                if let Err(e) = forward_notification(&self.dispatcher, &payload).await {
                    warn!(error = %e, "Dropping change notification");
                }
            }

            self.link.mark_lost();
            warn!(channel = %self.channel, "Subscriber connection lost, reconnecting");
        }

        self.link.set(LinkState::Disconnected);
        debug!("Pub/sub bridge stopped");
    }

    async fn subscribe(&self) -> TrackerResult<PubSub> {
        with_timeout(self.connect_timeout, || async {
            let mut pubsub = self
                .client
                .get_async_pubsub()
                .await
                .map_err(|e| TrackerError::StoreUnavailable(e.to_string()))?;
            pubsub
                .subscribe(&self.channel)
                .await
                .map_err(|e| TrackerError::StoreUnavailable(e.to_string()))?;
            Ok(pubsub)
        })
        .await
    }
}
