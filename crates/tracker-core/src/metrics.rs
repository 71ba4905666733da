//! Metrics for the resolution pipeline.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! server installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names.
pub mod names {
    /// Local cache hits.
    pub const CACHE_HITS_TOTAL: &str = "tracker_cache_hits_total";
    /// Local cache misses.
    pub const CACHE_MISSES_TOTAL: &str = "tracker_cache_misses_total";
    /// Records written into the local cache, labelled by source.
    pub const CACHE_WRITES_TOTAL: &str = "tracker_cache_writes_total";
    /// Local cache purges.
    pub const CACHE_PURGES_TOTAL: &str = "tracker_cache_purges_total";
    /// Approximate local cache entry count.
    pub const CACHE_ENTRIES: &str = "tracker_cache_entries";

    /// Failed backing store commands.
    pub const STORE_FAILURES_TOTAL: &str = "tracker_store_failures_total";
    /// Backing store reconnects.
    pub const STORE_RECONNECTS_TOTAL: &str = "tracker_store_reconnects_total";
    /// Change notifications received from the pub/sub channel.
    pub const PUBSUB_NOTIFICATIONS_TOTAL: &str = "tracker_pubsub_notifications_total";

    /// Successful stream appends.
    pub const STREAM_APPENDS_TOTAL: &str = "tracker_stream_appends_total";
    /// Failed stream appends.
    pub const STREAM_FAILURES_TOTAL: &str = "tracker_stream_failures_total";

    /// Requests that timed out waiting for a reply.
    pub const DISPATCH_TIMEOUTS_TOTAL: &str = "tracker_dispatch_timeouts_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of local cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of local cache misses");
    describe_counter!(
        names::CACHE_WRITES_TOTAL,
        "Total number of records written into the local cache"
    );
    describe_counter!(names::CACHE_PURGES_TOTAL, "Total number of local cache purges");
    describe_gauge!(names::CACHE_ENTRIES, "Approximate number of local cache entries");

    describe_counter!(
        names::STORE_FAILURES_TOTAL,
        "Total number of failed backing store commands"
    );
    describe_counter!(
        names::STORE_RECONNECTS_TOTAL,
        "Total number of backing store reconnects"
    );
    describe_counter!(
        names::PUBSUB_NOTIFICATIONS_TOTAL,
        "Total number of change notifications received"
    );

    describe_counter!(names::STREAM_APPENDS_TOTAL, "Total number of stream appends");
    describe_counter!(
        names::STREAM_FAILURES_TOTAL,
        "Total number of failed stream appends"
    );

    describe_counter!(
        names::DISPATCH_TIMEOUTS_TOTAL,
        "Total number of requests that timed out waiting for a reply"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn hit() {
        counter!(names::CACHE_HITS_TOTAL).increment(1);
    }

    pub fn miss() {
        counter!(names::CACHE_MISSES_TOTAL).increment(1);
    }

    /// Record a write; `source` is `fetch`, `store` or `refill`.
    pub fn write(source: &'static str) {
        counter!(names::CACHE_WRITES_TOTAL, "source" => source).increment(1);
    }

    pub fn purged() {
        counter!(names::CACHE_PURGES_TOTAL).increment(1);
    }

    pub fn entries(count: u64) {
        gauge!(names::CACHE_ENTRIES).set(count as f64);
    }
}

/// Backing store metrics recorder.
#[derive(Clone)]
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn command_failed(command: &'static str) {
        counter!(names::STORE_FAILURES_TOTAL, "command" => command).increment(1);
    }

    /// Record a reconnect; `connection` is `command` or `subscriber`.
    pub fn reconnected(connection: &'static str) {
        counter!(names::STORE_RECONNECTS_TOTAL, "connection" => connection).increment(1);
    }

    pub fn notification() {
        counter!(names::PUBSUB_NOTIFICATIONS_TOTAL).increment(1);
    }
}

/// Stream metrics recorder.
#[derive(Clone)]
pub struct StreamMetrics;

impl StreamMetrics {
    pub fn appended(stream: &str) {
        counter!(names::STREAM_APPENDS_TOTAL, "stream" => stream.to_string()).increment(1);
    }

    pub fn failed(stream: &str) {
        counter!(names::STREAM_FAILURES_TOTAL, "stream" => stream.to_string()).increment(1);
    }
}

/// Dispatcher metrics recorder.
#[derive(Clone)]
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn timed_out(address: &str) {
        counter!(names::DISPATCH_TIMEOUTS_TOTAL, "address" => address.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        register_metrics();
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        CacheMetrics::hit();
        CacheMetrics::miss();
        CacheMetrics::write("refill");
        CacheMetrics::entries(3);
        StoreMetrics::command_failed("HGETALL");
        StoreMetrics::reconnected("subscriber");
        StreamMetrics::appended("EventStream");
        DispatchMetrics::timed_out(crate::addresses::RESOLVE);
    }
}
