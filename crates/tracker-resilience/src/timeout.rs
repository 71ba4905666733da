//! Timeout wrapper for async operations.

use std::time::Duration;
use tracker_core::TrackerError;

/// Wraps an async operation with a timeout.
pub async fn with_timeout<F, Fut, T>(duration: Duration, f: F) -> Result<T, TrackerError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, TrackerError>>,
{
    tokio::time::timeout(duration, f())
        .await
        .map_err(|_| TrackerError::Timeout(format!("Operation timed out after {:?}", duration)))?
}
