//! # Tracker Stream
//!
//! Publishes resolved records to the downstream event stream as
//! protobuf-encoded `TrackingEvent`s, partitioned by message id.
//!
//! Kinesis Data Streams is the production sink. Redis Streams serves
//! deployments without AWS.

mod event;
mod kinesis_sink;
mod publisher;
mod redis_sink;
mod sink;

pub use event::*;
pub use kinesis_sink::*;
pub use publisher::*;
pub use redis_sink::*;
pub use sink::*;
