//! Common test infrastructure for Redis integration tests.

use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::{Redis, REDIS_PORT};
use tokio_util::sync::CancellationToken;
use tracker_config::RedisConfig;
use tracker_store::{LinkState, RedisRecordStore};

/// Redis testcontainer wrapper.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    config: RedisConfig,
}

impl TestRedis {
    /// Starts a fresh Redis container.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(REDIS_PORT)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port,
            pool_size: 4,
            connect_timeout_secs: 5,
            reconnect_initial_ms: 50,
            reconnect_max_ms: 500,
            ..RedisConfig::default()
        };

        Self {
            _container: container,
            config,
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Creates a store and waits for its command connection.
    pub async fn connected_store(&self, token: &CancellationToken) -> RedisRecordStore {
        let store = RedisRecordStore::new(&self.config).expect("Failed to create store");
        store.start(token.clone());
        assert!(
            store
                .link()
                .wait_for(LinkState::Connected, Duration::from_secs(10))
                .await,
            "Redis never became reachable"
        );
        store
    }
}
