//! # Tracker Core
//!
//! Core types, addresses, and error definitions for the event tracker.
//! Every other crate in the workspace builds on the record model and the
//! error taxonomy defined here.

pub mod addresses;
pub mod document;
pub mod error;
pub mod metrics;
pub mod record;
pub mod result;
pub mod telemetry;

pub use document::*;
pub use error::*;
pub use record::*;
pub use result::*;
