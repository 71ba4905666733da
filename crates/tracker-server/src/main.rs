//! # Event Tracker Server
//!
//! Main entry point for the event tracker.

use tokio::signal;
use tracing::{error, info};
use tracker_config::{AppConfig, ConfigLoader};
use tracker_core::telemetry::{init_telemetry, TelemetryConfig};
use tracker_core::{TrackerError, TrackerResult};
use tracker_rest::{create_router, AppState};
use tracker_server::startup::{install_metrics_recorder, print_banner, print_startup_info};
use tracker_server::Pipeline;

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.get().await,
        Err(e) => {
            let _ = init_telemetry(&TelemetryConfig::default());
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.observability.telemetry()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    print_banner();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.app.environment,
        "Starting event tracker"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Application error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> TrackerResult<()> {
    let metrics = if config.observability.metrics_enabled {
        Some(install_metrics_recorder()?)
    } else {
        None
    };

    let pipeline = Pipeline::start(&config).await?;

    let mut state = AppState::new(pipeline.dispatcher(), &config.server.fill_data_path);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let router = create_router(state, &config.server, &config.observability);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TrackerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    print_startup_info(&config);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TrackerError::Internal(format!("HTTP server error: {}", e)));

    pipeline.shutdown().await;
    info!("Server shutdown complete");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received terminate signal, initiating graceful shutdown"),
    }
}
