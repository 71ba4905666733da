//! # Tracker Server
//!
//! Wires the cache, the backing store and the stream publisher onto one
//! dispatcher and exposes startup helpers for the binary.

pub mod app;
pub mod startup;

pub use app::*;
