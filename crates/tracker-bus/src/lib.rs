//! # Tracker Bus
//!
//! Address-based message dispatcher connecting the pipeline components.
//!
//! Each component binds its addresses to a [`Handler`] at startup. The
//! dispatcher runs one loop per handler, so messages to a handler are
//! processed one at a time in arrival order. Two interaction styles exist:
//!
//! - [`Dispatcher::send`]: fire-and-forget delivery.
//! - [`Dispatcher::request`]: delivery with a single reply or failure,
//!   bounded by a timeout.

mod dispatcher;
mod error;
mod handler;
mod message;

pub use dispatcher::*;
pub use error::*;
pub use handler::*;
pub use message::*;
