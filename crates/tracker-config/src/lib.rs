//! # Tracker Config
//!
//! Configuration for the event tracker.
//! Values are layered from TOML files, `TRACKER__*` environment variables
//! and the legacy `REDIS_HOST`/`REDIS_PORT`/`REGION`/`EVENT_STREAM`
//! variables, then validated before use.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
