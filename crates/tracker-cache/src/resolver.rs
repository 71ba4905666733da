//! Cache-aside resolution.

use crate::RecordCache;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracker_bus::Dispatcher;
use tracker_core::addresses::STORE_FETCH;
use tracker_core::metrics::CacheMetrics;
use tracker_core::{is_not_found, ResolveRequest, TrackingRecord};

/// Resolves a program id to an enriched record.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns `None` when the program id is unknown. Backing store faults
    /// are reported as unknown as well.
    async fn resolve(&self, request: &ResolveRequest) -> Option<TrackingRecord>;
}

/// Reads the local cache first and fills it from the backing store.
///
/// A store fetch that outlives the fetch budget is answered as not found,
/// so a hung store never pushes the resolve past the caller's deadline.
/// The fetch keeps running and still fills the cache when it completes.
pub struct CacheAsideResolver {
    cache: Arc<dyn RecordCache>,
    dispatcher: Dispatcher,
    fetch_budget: Duration,
}

impl CacheAsideResolver {
    pub fn new(cache: Arc<dyn RecordCache>, dispatcher: Dispatcher) -> Self {
        let fetch_budget = fetch_budget_for(dispatcher.request_timeout());
        Self {
            cache,
            dispatcher,
            fetch_budget,
        }
    }

    /// How long a resolve waits on the store before answering not found.
    #[must_use]
    pub fn fetch_budget(&self) -> Duration {
        self.fetch_budget
    }

    /// Cache-only lookup. The returned record carries the request's
    /// message id.
    pub async fn lookup(&self, request: &ResolveRequest) -> Option<TrackingRecord> {
        match self.cache.get(&request.program_id).await {
            Some(mut record) => {
                CacheMetrics::hit();
                record.message_id.clone_from(&request.message_id);
                Some(record)
            }
            None => {
                CacheMetrics::miss();
                None
            }
        }
    }

    /// Fetches from the backing store and caches a found record.
    pub async fn load(&self, request: &ResolveRequest) -> Option<TrackingRecord> {
        let fetch = tokio::spawn(fetch_and_fill(
            self.cache.clone(),
            self.dispatcher.clone(),
            request.clone(),
        ));

        let mut record = match tokio::time::timeout(self.fetch_budget, fetch).await {
            Ok(Ok(found)) => found?,
            Ok(Err(e)) => {
                warn!(program_id = %request.program_id, error = %e, "Store fetch task failed");
                return None;
            }
            Err(_) => {
                warn!(
                    program_id = %request.program_id,
                    budget = ?self.fetch_budget,
                    "Store fetch over budget, treating as not found"
                );
                return None;
            }
        };

        record.message_id.clone_from(&request.message_id);
        Some(record)
    }
}

/// Leaves a fifth of the request deadline for the reply to travel back.
fn fetch_budget_for(request_timeout: Duration) -> Duration {
    request_timeout * 4 / 5
}

async fn fetch_and_fill(
    cache: Arc<dyn RecordCache>,
    dispatcher: Dispatcher,
    request: ResolveRequest,
) -> Option<TrackingRecord> {
    let reply = match dispatcher.request(STORE_FETCH, request.to_document()).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(program_id = %request.program_id, error = %e, "Store fetch failed, treating as not found");
            return None;
        }
    };

    if is_not_found(&reply) {
        debug!(program_id = %request.program_id, "Program id not in store");
        return None;
    }

    let record = match TrackingRecord::from_document(&reply) {
        Ok(record) => record,
        Err(e) => {
            warn!(program_id = %request.program_id, error = %e, "Undecodable store reply");
            return None;
        }
    };

    cache.put(record.clone()).await;
    CacheMetrics::write("fetch");
    CacheMetrics::entries(cache.entry_count());
    Some(record)
}

#[async_trait]
impl Resolver for CacheAsideResolver {
    async fn resolve(&self, request: &ResolveRequest) -> Option<TrackingRecord> {
        match self.lookup(request).await {
            Some(record) => Some(record),
            None => self.load(request).await,
        }
    }
}
