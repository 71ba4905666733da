//! Redis hash store with supervised reconnects.

use crate::{decode_fields, encode_fields, ConnectionLink, LinkState, RecordStore};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolError, Runtime};
use redis::{AsyncCommands, RedisError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracker_config::RedisConfig;
use tracker_core::metrics::StoreMetrics;
use tracker_core::{TrackerError, TrackerResult, TrackingRecord};
use tracker_resilience::{with_timeout, RetryPolicy};

/// Create a Redis connection pool.
///
/// The pool connects lazily; reachability is established by
/// [`RedisRecordStore::start`].
pub fn create_pool(config: &RedisConfig) -> TrackerResult<Pool> {
    let cfg = Config::from_url(config.url());

    cfg.builder()
        .map_err(|e| TrackerError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .wait_timeout(Some(config.connect_timeout()))
        .create_timeout(Some(config.connect_timeout()))
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| TrackerError::Configuration(format!("Failed to create pool: {}", e)))
}

/// Record store backed by Redis hashes.
///
/// Commands fail fast with `StoreUnavailable` unless the command link is
/// `Connected`. A connection-level failure drops the link and wakes the
/// supervisor, which reconnects with capped exponential backoff.
#[derive(Clone)]
pub struct RedisRecordStore {
    pool: Pool,
    link: Arc<ConnectionLink>,
    lost: Arc<Notify>,
    policy: RetryPolicy,
    connect_timeout: Duration,
}

impl RedisRecordStore {
    pub fn new(config: &RedisConfig) -> TrackerResult<Self> {
        Ok(Self::with_pool(
            create_pool(config)?,
            RetryPolicy::reconnect(config.reconnect_initial(), config.reconnect_max()),
            config.connect_timeout(),
        ))
    }

    #[must_use]
    pub fn with_pool(pool: Pool, policy: RetryPolicy, connect_timeout: Duration) -> Self {
        Self {
            pool,
            link: Arc::new(ConnectionLink::new("command")),
            lost: Arc::new(Notify::new()),
            policy,
            connect_timeout,
        }
    }

    /// The command connection's state.
    #[must_use]
    pub fn link(&self) -> Arc<ConnectionLink> {
        self.link.clone()
    }

    /// Starts the connection supervisor.
    pub fn start(&self, token: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move { store.supervise(token).await })
    }

    async fn supervise(self, token: CancellationToken) {
        let mut established_before = false;

        loop {
            self.link.set(LinkState::Connecting);
            debug!("Connecting to Redis");

            let connect = self.policy.execute(|| self.ping());
            let result = tokio::select! {
                () = token.cancelled() => break,
                result = connect => result,
            };
            if let Err(e) = result {
                warn!(error = %e, "Redis connection attempts exhausted, starting over");
                continue;
            }

            self.link.set(LinkState::Connected);
            if established_before {
                StoreMetrics::reconnected("command");
                info!("Redis command connection re-established");
            } else {
                info!("Redis command connection established");
            }
            established_before = true;

            tokio::select! {
                () = token.cancelled() => break,
                () = self.lost.notified() => {
                    warn!("Redis command connection lost, reconnecting");
                }
            }
        }

        self.link.set(LinkState::Disconnected);
        debug!("Redis supervisor stopped");
    }

    async fn ping(&self) -> TrackerResult<()> {
        with_timeout(self.connect_timeout, || async {
            let mut conn = self.pool.get().await.map_err(pool_unavailable)?;
            redis::cmd("PING")
                .query_async::<String>(&mut *conn)
                .await
                .map_err(|e| TrackerError::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn conn(&self, command: &'static str) -> TrackerResult<deadpool_redis::Connection> {
        self.link.ensure_connected()?;
        match self.pool.get().await {
            Ok(conn) => Ok(conn),
            Err(e) => {
                StoreMetrics::command_failed(command);
                self.connection_lost();
                Err(pool_unavailable(e))
            }
        }
    }

    fn command_error(&self, command: &'static str, err: RedisError) -> TrackerError {
        StoreMetrics::command_failed(command);
        if is_connection_error(&err) {
            self.connection_lost();
            TrackerError::StoreUnavailable(format!("{} failed: {}", command, err))
        } else {
            TrackerError::Store(format!("{} failed: {}", command, err))
        }
    }

    fn connection_lost(&self) {
        if self.link.mark_lost() {
            self.lost.notify_one();
        }
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_io_error()
        || err.is_timeout()
}

fn pool_unavailable(err: PoolError) -> TrackerError {
    TrackerError::StoreUnavailable(format!("Failed to get Redis connection: {}", err))
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn fetch(&self, program_id: &str) -> TrackerResult<Option<TrackingRecord>> {
        let mut conn = self.conn("HGETALL").await?;
        let fields: HashMap<String, String> = conn
            .hgetall(program_id)
            .await
            .map_err(|e| self.command_error("HGETALL", e))?;

        if fields.is_empty() {
            return Ok(None);
        }
        decode_fields(&fields).map(Some)
    }

    async fn store(&self, record: &TrackingRecord) -> TrackerResult<()> {
        let mut conn = self.conn("HSET").await?;
        let fields = encode_fields(record);
        // replace, not merge: fields the new record lacks must not linger
        redis::pipe()
            .atomic()
            .del(&record.program_id)
            .ignore()
            .hset_multiple(&record.program_id, fields.as_slice())
            .ignore()
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| self.command_error("HSET", e))?;
        Ok(())
    }

    async fn delete(&self, program_id: &str) -> TrackerResult<bool> {
        let mut conn = self.conn("DEL").await?;
        let removed: i64 = conn
            .del(program_id)
            .await
            .map_err(|e| self.command_error("DEL", e))?;
        Ok(removed > 0)
    }

    async fn flush_all(&self) -> TrackerResult<()> {
        let mut conn = self.conn("FLUSHALL").await?;
        redis::cmd("FLUSHALL")
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| self.command_error("FLUSHALL", e))
    }
}
