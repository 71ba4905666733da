//! Dispatcher addresses.
//!
//! Each component binds a fixed set of these at startup.

/// Resolve a program id through the local cache.
pub const RESOLVE: &str = "tracker.cache.resolve";
/// Unconditional local cache upsert, used by bulk warm-up.
pub const CACHE_STORE: &str = "tracker.cache.store";
/// Local cache upsert from a store change notification.
pub const CACHE_REFILL: &str = "tracker.cache.refill";
/// Drop every local cache entry.
pub const CACHE_PURGE: &str = "tracker.cache.purge";

/// Read a record from the backing store.
pub const STORE_FETCH: &str = "tracker.store.fetch";
/// Write a record to the backing store.
pub const STORE_WRITE: &str = "tracker.store.write";
/// Flush the backing store.
pub const STORE_PURGE: &str = "tracker.store.purge";
/// Remove one key from the backing store.
pub const STORE_DELETE: &str = "tracker.store.delete";

/// Append a resolved record to the downstream stream.
pub const STREAM_PUBLISH: &str = "tracker.stream.publish";
