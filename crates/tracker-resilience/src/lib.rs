//! # Tracker Resilience
//!
//! Backoff and timeout helpers used by the backing store connections.

pub mod retry;
pub mod timeout;

pub use retry::*;
pub use timeout::*;
