//! Configuration validation.
//!
//! Collects every problem instead of stopping at the first one, so a bad
//! deployment reports all of its mistakes at startup.

use crate::{AppConfig, StreamBackend};
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// A size or capacity must be positive.
    ZeroCapacity { name: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String },
    /// A required name is empty.
    EmptyName { name: String },
    /// Reconnect backoff bounds are inverted.
    InvalidBackoff { initial_ms: u64, max_ms: u64 },
    /// Metrics path must start with '/'.
    InvalidMetricsPath { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::ZeroCapacity { name } => write!(f, "'{}' must be greater than zero", name),
            Self::NonPositiveTimeout { name } => write!(f, "Timeout '{}' must be positive", name),
            Self::EmptyName { name } => write!(f, "'{}' cannot be empty", name),
            Self::InvalidBackoff { initial_ms, max_ms } => write!(
                f,
                "Reconnect backoff initial delay ({}ms) exceeds the maximum ({}ms)",
                initial_ms, max_ms
            ),
            Self::InvalidMetricsPath { value } => {
                write!(f, "Metrics path '{}' must start with '/'", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(config, &mut errors);
        Self::validate_redis(config, &mut errors);
        Self::validate_cache(config, &mut errors);
        Self::validate_stream(config, &mut errors);
        Self::validate_dispatch(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.server.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: 0,
            });
        }
    }

    fn validate_redis(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let redis = &config.redis;
        if redis.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "redis.port".to_string(),
                value: 0,
            });
        }
        if redis.host.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyName {
                name: "redis.host".to_string(),
            });
        }
        if redis.channel.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyName {
                name: "redis.channel".to_string(),
            });
        }
        if redis.pool_size == 0 {
            errors.push(ConfigValidationError::ZeroCapacity {
                name: "redis.pool_size".to_string(),
            });
        }
        if redis.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "redis.connect_timeout_secs".to_string(),
            });
        }
        if redis.reconnect_initial_ms > redis.reconnect_max_ms {
            errors.push(ConfigValidationError::InvalidBackoff {
                initial_ms: redis.reconnect_initial_ms,
                max_ms: redis.reconnect_max_ms,
            });
        }
    }

    fn validate_cache(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.cache.max_entries == 0 {
            errors.push(ConfigValidationError::ZeroCapacity {
                name: "cache.max_entries".to_string(),
            });
        }
        if config.cache.ttl_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "cache.ttl_secs".to_string(),
            });
        }
    }

    fn validate_stream(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.stream.name.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyName {
                name: "stream.name".to_string(),
            });
        }
        if config.stream.backend == StreamBackend::Kinesis && config.stream.region.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyName {
                name: "stream.region".to_string(),
            });
        }
        if config.stream.max_in_flight == 0 {
            errors.push(ConfigValidationError::ZeroCapacity {
                name: "stream.max_in_flight".to_string(),
            });
        }
    }

    fn validate_dispatch(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.dispatch.request_timeout_ms == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "dispatch.request_timeout_ms".to_string(),
            });
        }
        if config.dispatch.channel_capacity == 0 {
            errors.push(ConfigValidationError::ZeroCapacity {
                name: "dispatch.channel_capacity".to_string(),
            });
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let path = &config.observability.metrics_path;
        if config.observability.metrics_enabled && !path.starts_with('/') {
            errors.push(ConfigValidationError::InvalidMetricsPath {
                value: path.clone(),
            });
        }
    }
}
