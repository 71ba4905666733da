//! # Tracker REST
//!
//! HTTP front end for the event tracker. Handlers translate requests into
//! dispatcher messages and never touch the cache or the store directly.

pub mod controllers;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
