//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracker_core::telemetry::{LogFormat, TelemetryConfig};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Backing store configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Local cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Downstream stream configuration.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Dispatcher configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    pub name: String,
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "event-tracker".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON array of records loaded by `/cache/fill`.
    pub fill_data_path: String,
    /// Gzip response compression.
    pub compression: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            fill_data_path: "data/records.json".to_string(),
            compression: true,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Disable to run against the in-memory store.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Command connection pool size.
    pub pool_size: usize,
    pub connect_timeout_secs: u64,
    /// Pub/sub channel carrying change notifications.
    pub channel: String,
    /// First reconnect delay.
    pub reconnect_initial_ms: u64,
    /// Reconnect delay cap.
    pub reconnect_max_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 6379,
            pool_size: 10,
            connect_timeout_secs: 5,
            channel: "channel1".to_string(),
            reconnect_initial_ms: 100,
            reconnect_max_ms: 10_000,
        }
    }
}

impl RedisConfig {
    /// Returns the Redis URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    #[must_use]
    pub const fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}

/// Local cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,
    /// Time to live after the last write.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            ttl_secs: 600,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Service the downstream stream lives on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamBackend {
    /// Amazon Kinesis Data Streams.
    #[default]
    Kinesis,
    /// Redis Streams, appended with `XADD`.
    Redis,
}

/// Downstream stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Disable to keep appends in memory.
    pub enabled: bool,
    pub backend: StreamBackend,
    pub name: String,
    /// AWS region of the Kinesis stream.
    pub region: String,
    /// Endpoint override. For Redis it falls back to the Redis endpoint.
    pub url: Option<String>,
    /// Approximate stream length cap, 0 for unbounded.
    pub max_len: usize,
    /// Concurrent appends.
    pub max_in_flight: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: StreamBackend::Kinesis,
            name: "EventStream".to_string(),
            region: "us-east-1".to_string(),
            url: None,
            max_len: 1_000_000,
            max_in_flight: 64,
        }
    }
}

impl StreamConfig {
    /// Returns the Redis Streams endpoint, defaulting to the Redis endpoint.
    #[must_use]
    pub fn endpoint(&self, redis: &RedisConfig) -> String {
        self.url.clone().unwrap_or_else(|| redis.url())
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Default request/reply timeout.
    pub request_timeout_ms: u64,
    /// Per-handler inbox capacity.
    pub channel_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            channel_capacity: 1_024,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
    pub metrics_path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: TelemetryConfig::default().filter,
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Returns the logging settings.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            filter: self.log_filter.clone(),
            format: self.log_format,
            ..TelemetryConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.redis.url(), "redis://localhost:6379");
        assert_eq!(config.redis.channel, "channel1");
        assert_eq!(config.cache.max_entries, 100_000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(600));
        assert_eq!(config.stream.name, "EventStream");
        assert_eq!(config.stream.region, "us-east-1");
        assert_eq!(config.stream.backend, StreamBackend::Kinesis);
        assert_eq!(config.dispatch.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_stream_endpoint_falls_back_to_redis() {
        let mut config = AppConfig::default();
        config.redis.host = "cache.internal".to_string();
        assert_eq!(config.stream.endpoint(&config.redis), "redis://cache.internal:6379");

        config.stream.url = Some("redis://stream:6380".to_string());
        assert_eq!(config.stream.endpoint(&config.redis), "redis://stream:6380");
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"redis": {"host": "redis"}, "observability": {"log_format": "json"}}"#)
                .unwrap();
        assert_eq!(config.redis.host, "redis");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.telemetry().format, LogFormat::Json);
    }

    #[test]
    fn test_stream_backend_is_lowercase() {
        let config: AppConfig = serde_json::from_str(r#"{"stream": {"backend": "redis"}}"#).unwrap();
        assert_eq!(config.stream.backend, StreamBackend::Redis);
        assert_eq!(config.stream.name, "EventStream");
        assert!(serde_json::from_str::<AppConfig>(r#"{"stream": {"backend": "sqs"}}"#).is_err());
    }
}
