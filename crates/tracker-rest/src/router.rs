//! Main application router.

use crate::{
    controllers::{cache_controller, event_controller, health_controller, metrics_controller},
    middleware::logging_middleware,
    state::AppState,
};
use axum::{middleware, routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;
use tracker_config::{ObservabilityConfig, ServerConfig};

/// Creates the application router.
pub fn create_router(
    state: AppState,
    server_config: &ServerConfig,
    observability: &ObservabilityConfig,
) -> Router {
    let mut router = Router::new()
        .merge(event_controller::router())
        .merge(cache_controller::router())
        .merge(health_controller::router());

    if observability.metrics_enabled {
        router = router.route(&observability.metrics_path, get(metrics_controller::render_metrics));
    }

    let mut router = router.with_state(state);
    if server_config.compression {
        router = router.layer(CompressionLayer::new());
    }

    let router = router
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware));

    info!(
        compression = server_config.compression,
        metrics = observability.metrics_enabled,
        "Router created"
    );
    router
}
