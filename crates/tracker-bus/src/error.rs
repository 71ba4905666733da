//! Dispatcher error types.

use std::time::Duration;
use thiserror::Error;
use tracker_core::TrackerError;

/// Errors raised by the dispatcher or replied by a handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Nothing is bound to the address.
    #[error("No handler registered for address '{0}'")]
    NoHandler(String),

    /// The address is already bound to another handler.
    #[error("Address '{0}' is already registered")]
    AlreadyRegistered(String),

    /// No reply arrived before the deadline.
    #[error("Request to '{address}' timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// The handler dropped the request without replying.
    #[error("Handler for '{0}' dropped the request without replying")]
    NoReply(String),

    /// The handler explicitly failed the request.
    #[error("Request failed: {0}")]
    Failed(String),

    /// The request body could not be decoded.
    #[error("Decode error: {0}")]
    Codec(String),

    /// The handler loop for the address has stopped.
    #[error("Handler for '{0}' is closed")]
    Closed(String),

    /// The dispatcher is shutting down.
    #[error("Dispatcher is shutting down")]
    ShuttingDown,
}

impl From<BusError> for TrackerError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Codec(message) => Self::Decode(message),
            BusError::Timeout { .. } => Self::Timeout(err.to_string()),
            other => Self::Dispatch(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_tracker_error() {
        let timeout = BusError::Timeout {
            address: "a".to_string(),
            timeout: Duration::from_millis(10),
        };
        assert!(matches!(TrackerError::from(timeout), TrackerError::Timeout(_)));
        assert!(matches!(
            TrackerError::from(BusError::Codec("bad".to_string())),
            TrackerError::Decode(_)
        ));
        assert!(matches!(
            TrackerError::from(BusError::NoHandler("a".to_string())),
            TrackerError::Dispatch(_)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BusError::NoHandler("tracker.cache.resolve".to_string()).to_string(),
            "No handler registered for address 'tracker.cache.resolve'"
        );
    }
}
