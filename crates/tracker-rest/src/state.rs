//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use tracker_bus::Dispatcher;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// JSON array of records loaded by `/cache/fill`.
    pub fill_data_path: PathBuf,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, fill_data_path: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher,
            fill_data_path: fill_data_path.into(),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
