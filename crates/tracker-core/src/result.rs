//! Result type aliases for the event tracker.

use crate::TrackerError;

/// A specialized `Result` type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
