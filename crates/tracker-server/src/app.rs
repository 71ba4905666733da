//! Pipeline assembly and lifecycle.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracker_bus::{Dispatcher, DispatcherOptions};
use tracker_cache::{CacheHandler, LocalCache};
use tracker_config::{AppConfig, StreamBackend};
use tracker_core::TrackerResult;
use tracker_store::{
    ConnectionLink, InMemoryRecordStore, PubSubBridge, RecordStore, RedisRecordStore, StoreHandler,
};
use tracker_stream::{EventSink, InMemoryEventSink, KinesisEventSink, PublisherHandler, RedisStreamSink};

/// The running resolution pipeline.
///
/// Owns the dispatcher, every bound component and the background
/// connection tasks of the Redis adapter.
pub struct Pipeline {
    dispatcher: Dispatcher,
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    links: Vec<Arc<ConnectionLink>>,
}

impl Pipeline {
    /// Builds the pipeline described by `config` and starts its connections.
    ///
    /// With Redis disabled the store falls back to an in-memory
    /// implementation, and so does the stream when it is disabled.
    pub async fn start(config: &AppConfig) -> TrackerResult<Self> {
        let dispatcher = dispatcher_for(config);

        let redis = if config.redis.enabled {
            let store = RedisRecordStore::new(&config.redis)?;
            let bridge = PubSubBridge::new(&config.redis, dispatcher.clone())?;
            Some((store, bridge))
        } else {
            warn!("Redis disabled, records are kept in memory");
            None
        };

        let sink = sink_for(config).await?;

        let store: Arc<dyn RecordStore> = match &redis {
            Some((store, _)) => Arc::new(store.clone()),
            None => Arc::new(InMemoryRecordStore::new()),
        };

        let mut pipeline = Self::assemble(config, dispatcher, store, sink)?;

        // connections start after every address is bound so early
        // notifications find the cache
        if let Some((store, bridge)) = redis {
            pipeline.links.push(store.link());
            pipeline.links.push(bridge.link());
            pipeline.tasks.push(store.start(pipeline.token.child_token()));
            pipeline.tasks.push(bridge.start(pipeline.token.child_token()));
        }

        info!("Pipeline started");
        Ok(pipeline)
    }

    /// Builds the pipeline over caller-supplied store and sink, without
    /// background connections.
    pub fn with_components(
        config: &AppConfig,
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn EventSink>,
    ) -> TrackerResult<Self> {
        Self::assemble(config, dispatcher_for(config), store, sink)
    }

    fn assemble(
        config: &AppConfig,
        dispatcher: Dispatcher,
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn EventSink>,
    ) -> TrackerResult<Self> {
        let cache = Arc::new(LocalCache::new(config.cache.max_entries, config.cache.ttl()));
        CacheHandler::bind(cache, &dispatcher)?;
        StoreHandler::bind(store, &dispatcher)?;
        PublisherHandler::bind(
            sink,
            config.stream.name.clone(),
            config.stream.max_in_flight,
            &dispatcher,
        )?;

        Ok(Self {
            dispatcher,
            token: CancellationToken::new(),
            tasks: Vec::new(),
            links: Vec::new(),
        })
    }

    /// Handle for sending messages into the pipeline.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Redis connection states, empty when Redis is disabled.
    #[must_use]
    pub fn links(&self) -> &[Arc<ConnectionLink>] {
        &self.links
    }

    /// Stops the connection tasks, then the dispatcher.
    pub async fn shutdown(self) {
        self.token.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Connection task failed");
            }
        }
        self.dispatcher.shutdown().await;
        debug!("Pipeline stopped");
    }
}

async fn sink_for(config: &AppConfig) -> TrackerResult<Arc<dyn EventSink>> {
    let stream = &config.stream;
    if !stream.enabled {
        warn!("Event stream disabled, appends are kept in memory");
        return Ok(Arc::new(InMemoryEventSink::new()));
    }

    match stream.backend {
        StreamBackend::Kinesis => {
            info!(stream = %stream.name, region = %stream.region, "Publishing to Kinesis");
            Ok(Arc::new(KinesisEventSink::new(stream).await))
        }
        StreamBackend::Redis => {
            info!(stream = %stream.name, "Publishing to Redis stream");
            Ok(Arc::new(RedisStreamSink::new(stream, &config.redis)?))
        }
    }
}

fn dispatcher_for(config: &AppConfig) -> Dispatcher {
    Dispatcher::new(DispatcherOptions {
        request_timeout: config.dispatch.request_timeout(),
        channel_capacity: config.dispatch.channel_capacity,
    })
}
