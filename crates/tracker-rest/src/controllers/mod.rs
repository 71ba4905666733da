//! REST API controllers.

pub mod cache_controller;
pub mod event_controller;
pub mod health_controller;
pub mod metrics_controller;

pub use health_controller::*;
