//! Dispatcher-facing cache component.

use crate::{CacheAsideResolver, RecordCache};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracker_bus::{BusError, Dispatcher, Handler, Message};
use tracker_core::addresses::{CACHE_PURGE, CACHE_REFILL, CACHE_STORE, RESOLVE};
use tracker_core::metrics::CacheMetrics;
use tracker_core::{not_found, ResolveRequest, TrackingRecord};

/// Owns the local cache and serves resolve, store, refill and purge.
///
/// Hits are answered inline. A miss hands the request to a spawned task so
/// the handler loop keeps draining its inbox while the store is queried.
pub struct CacheHandler {
    cache: Arc<dyn RecordCache>,
    resolver: Arc<CacheAsideResolver>,
}

impl CacheHandler {
    /// Addresses served by this component.
    pub const ADDRESSES: [&'static str; 4] = [RESOLVE, CACHE_STORE, CACHE_REFILL, CACHE_PURGE];

    pub fn new(cache: Arc<dyn RecordCache>, dispatcher: Dispatcher) -> Self {
        let resolver = Arc::new(CacheAsideResolver::new(cache.clone(), dispatcher));
        Self { cache, resolver }
    }

    /// Creates the handler and binds it.
    pub fn bind(cache: Arc<dyn RecordCache>, dispatcher: &Dispatcher) -> Result<(), BusError> {
        let handler = Arc::new(Self::new(cache, dispatcher.clone()));
        dispatcher.bind(&Self::ADDRESSES, handler)
    }

    async fn on_resolve(&self, message: Message) {
        let request = match ResolveRequest::from_document(message.body()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting undecodable resolve request");
                message.fail(BusError::Codec(e.to_string()));
                return;
            }
        };

        if let Some(record) = self.resolver.lookup(&request).await {
            message.reply(record.to_document());
            return;
        }

        let resolver = self.resolver.clone();
        let (_, _, replier) = message.into_parts();
        tokio::spawn(async move {
            let reply = match resolver.load(&request).await {
                Some(record) => record.to_document(),
                None => not_found(),
            };
            replier.reply(reply);
        });
    }

    async fn on_put(&self, message: Message, source: &'static str) {
        match TrackingRecord::from_document(message.body()) {
            Ok(record) => {
                debug!(program_id = %record.program_id, source, "Caching record");
                self.cache.put(record).await;
                CacheMetrics::write(source);
                CacheMetrics::entries(self.cache.entry_count());
            }
            Err(e) => {
                warn!(error = %e, source, "Dropping undecodable record");
                message.fail(BusError::Codec(e.to_string()));
            }
        }
    }

    async fn on_purge(&self) {
        self.cache.purge().await;
        CacheMetrics::purged();
        CacheMetrics::entries(0);
        info!("Local cache purged");
    }
}

#[async_trait]
impl Handler for CacheHandler {
    fn name(&self) -> &'static str {
        "local-cache"
    }

    async fn handle(&self, message: Message) {
        match message.address() {
            RESOLVE => self.on_resolve(message).await,
            CACHE_STORE => self.on_put(message, "store").await,
            CACHE_REFILL => self.on_put(message, "refill").await,
            CACHE_PURGE => self.on_purge().await,
            other => warn!(address = other, "Unexpected address"),
        }
    }

    async fn on_stop(&self) {
        info!(entries = self.cache.entry_count(), "Local cache stopped");
    }
}
