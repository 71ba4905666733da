//! Redis Streams sink.

use crate::EventSink;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use tracing::debug;
use tracker_config::{RedisConfig, StreamConfig};
use tracker_core::{TrackerError, TrackerResult};

/// Field holding the partition key in each stream entry.
pub const PARTITION_KEY_FIELD: &str = "partitionKey";
/// Field holding the encoded record in each stream entry.
pub const DATA_FIELD: &str = "data";

/// Appends records to a Redis stream with `XADD`.
///
/// Uses its own pool, independent of the backing store's connection
/// supervision.
#[derive(Clone)]
pub struct RedisStreamSink {
    pool: Pool,
    max_len: usize,
}

impl RedisStreamSink {
    pub fn new(stream: &StreamConfig, redis: &RedisConfig) -> TrackerResult<Self> {
        let pool = Config::from_url(stream.endpoint(redis))
            .builder()
            .map_err(|e| TrackerError::Configuration(format!("Invalid stream endpoint: {}", e)))?
            .max_size(stream.max_in_flight.max(1))
            .wait_timeout(Some(redis.connect_timeout()))
            .create_timeout(Some(redis.connect_timeout()))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| TrackerError::Configuration(format!("Failed to create stream pool: {}", e)))?;

        Ok(Self {
            pool,
            max_len: stream.max_len,
        })
    }
}

/// Builds the `XADD` command for one entry.
fn xadd(stream: &str, partition_key: &str, data: &[u8], max_len: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(stream);
    if max_len > 0 {
        cmd.arg("MAXLEN").arg("~").arg(max_len);
    }
    cmd.arg("*")
        .arg(PARTITION_KEY_FIELD)
        .arg(partition_key)
        .arg(DATA_FIELD)
        .arg(data);
    cmd
}

#[async_trait]
impl EventSink for RedisStreamSink {
    async fn append(&self, stream: &str, partition_key: &str, data: Vec<u8>) -> TrackerResult<String> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| TrackerError::Publish(format!("No stream connection: {}", e)))?;

        let id: String = xadd(stream, partition_key, &data, self.max_len)
            .query_async(&mut *conn)
            .await
            .map_err(|e| TrackerError::Publish(format!("XADD {} failed: {}", stream, e)))?;

        debug!(stream, partition_key, id = %id, "Appended stream record");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(parts: &[&[u8]]) -> Vec<u8> {
        let mut cmd = redis::cmd(std::str::from_utf8(parts[0]).unwrap());
        for part in &parts[1..] {
            cmd.arg(*part);
        }
        cmd.get_packed_command()
    }

    #[test]
    fn test_xadd_caps_length() {
        let cmd = xadd("EventStream", "m1", &[1, 2], 1000);
        let expected = packed(&[
            b"XADD",
            b"EventStream",
            b"MAXLEN",
            b"~",
            b"1000",
            b"*",
            b"partitionKey",
            b"m1",
            b"data",
            &[1, 2],
        ]);
        assert_eq!(cmd.get_packed_command(), expected);
    }

    #[test]
    fn test_xadd_unbounded() {
        let cmd = xadd("EventStream", "m1", &[7], 0);
        let expected = packed(&[b"XADD", b"EventStream", b"*", b"partitionKey", b"m1", b"data", &[7]]);
        assert_eq!(cmd.get_packed_command(), expected);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_as_publish_error() {
        let redis = RedisConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 1,
            ..RedisConfig::default()
        };
        let sink = RedisStreamSink::new(&StreamConfig::default(), &redis).unwrap();
        let err = sink.append("EventStream", "k", vec![1]).await.unwrap_err();
        assert!(matches!(err, TrackerError::Publish(_)));
    }
}
