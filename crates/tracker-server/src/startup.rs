//! Server startup utilities.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracker_config::AppConfig;
use tracker_core::{metrics::register_metrics, TrackerError, TrackerResult};

/// Prints the startup banner.
pub fn print_banner() {
    info!(
        r#"
  _____                 _     _____               _
 | ____|_   _____ _ __ | |_  |_   _| __ __ _  ___| | _____ _ __
 |  _| \ \ / / _ \ '_ \| __|   | || '__/ _` |/ __| |/ / _ \ '__|
 | |___ \ V /  __/ | | | |_    | || | | (_| | (__|   <  __/ |
 |_____| \_/ \___|_| |_|\__|   |_||_|  \__,_|\___|_|\_\___|_|
    "#
    );
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    let addr = config.server.addr();
    info!("{}", separator);
    info!("Events:    http://{}/event/{{id}}", addr);
    info!("Health:    http://{}/health/check", addr);
    if config.observability.metrics_enabled {
        info!("Metrics:   http://{}{}", addr, config.observability.metrics_path);
    }
    if config.redis.enabled {
        info!("Redis:     {}:{} (channel {})", config.redis.host, config.redis.port, config.redis.channel);
    }
    info!("Stream:    {} ({})", config.stream.name, config.stream.region);
    info!("{}", separator);
}

/// Installs the global Prometheus recorder and describes every metric.
pub fn install_metrics_recorder() -> TrackerResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TrackerError::Configuration(format!("Failed to install metrics recorder: {}", e)))?;
    register_metrics();
    Ok(handle)
}
