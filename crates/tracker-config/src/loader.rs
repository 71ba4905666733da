//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use tracker_core::TrackerError;

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `TRACKER__` prefix
    /// 5. Legacy `REDIS_HOST`, `REDIS_PORT`, `REGION`, `EVENT_STREAM`
    pub fn new(config_dir: impl Into<String>) -> Result<Self, TrackerError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, TrackerError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), TrackerError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, TrackerError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("TRACKER_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("TRACKER")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in legacy_overrides(|name| std::env::var(name).ok()) {
            debug!("Applying legacy override for {}", key);
            builder = builder
                .set_override(key, value)
                .map_err(config_error_to_tracker_error)?;
        }

        let app_config: AppConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error_to_tracker_error)?;

        validate(&app_config)?;
        Ok(app_config)
    }
}

/// Validates a configuration, folding every problem into one error.
pub fn validate(config: &AppConfig) -> Result<(), TrackerError> {
    ConfigValidator::validate(config).map_err(|errors| {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        TrackerError::Configuration(message)
    })
}

/// Maps the legacy deployment variables onto configuration keys.
///
/// These win over every other source. A `REDIS_PORT` that is not a number
/// is ignored with a warning.
pub fn legacy_overrides<F>(lookup: F) -> Vec<(&'static str, Value)>
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = Vec::new();

    if let Some(host) = lookup("REDIS_HOST").filter(|v| !v.is_empty()) {
        overrides.push(("redis.host", Value::from(host)));
    }
    if let Some(port) = lookup("REDIS_PORT") {
        match port.parse::<u16>() {
            Ok(port) => overrides.push(("redis.port", Value::from(i64::from(port)))),
            Err(_) => warn!("Ignoring REDIS_PORT={:?}: not a port number", port),
        }
    }
    if let Some(region) = lookup("REGION").filter(|v| !v.is_empty()) {
        overrides.push(("stream.region", Value::from(region)));
    }
    if let Some(stream) = lookup("EVENT_STREAM").filter(|v| !v.is_empty()) {
        overrides.push(("stream.name", Value::from(stream)));
    }

    overrides
}

fn config_error_to_tracker_error(err: ConfigError) -> TrackerError {
    TrackerError::Configuration(err.to_string())
}
