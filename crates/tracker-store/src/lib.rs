//! # Tracker Store
//!
//! Backing store adapter for the event tracker.
//!
//! Records live in Redis as one hash per program id. The adapter owns two
//! connections with independent lifecycles: a pooled command connection
//! used for fetch/write/delete/flush, and a dedicated subscriber connection
//! that turns change notifications into local cache refills.

mod codec;
mod handler;
mod link;
mod memory;
mod pubsub;
mod redis_store;
mod store;

pub use codec::*;
pub use handler::*;
pub use link::*;
pub use memory::*;
pub use pubsub::*;
pub use redis_store::*;
pub use store::*;
