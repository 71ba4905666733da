//! Integration tests for the Redis store and pub/sub bridge.
//!
//! These tests run against a real Redis using testcontainers and need
//! Docker, so they are ignored by default:
//! `cargo test -p tracker-store -- --ignored`.

mod common;

use async_trait::async_trait;
use common::TestRedis;
use parking_lot::Mutex;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracker_bus::{Dispatcher, Handler, Message};
use tracker_core::addresses::CACHE_REFILL;
use tracker_core::{Document, TrackingRecord};
use tracker_store::{LinkState, PubSubBridge, RecordStore};

fn sample() -> TrackingRecord {
    TrackingRecord {
        program_name: Some("myProgram".to_string()),
        checksum: Some("check123".to_string()),
        customer_id: Some(1234),
        customer_name: Some("myCustomer".to_string()),
        user_agent: Some("myUserAgent".to_string()),
        valid: true,
        ..TrackingRecord::new("12345").with_message_id("m0")
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_store_and_fetch() {
    let redis = TestRedis::new().await;
    let token = CancellationToken::new();
    let store = redis.connected_store(&token).await;

    store.store(&sample()).await.expect("Failed to store");
    let fetched = store
        .fetch("12345")
        .await
        .expect("Fetch failed")
        .expect("Record not found");

    assert_eq!(fetched.program_name.as_deref(), Some("myProgram"));
    assert_eq!(fetched.customer_id, Some(1234));
    assert!(fetched.valid);
    assert!(fetched.message_id.is_none());

    token.cancel();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_hash_layout() {
    let redis = TestRedis::new().await;
    let token = CancellationToken::new();
    let store = redis.connected_store(&token).await;
    store.store(&sample()).await.unwrap();

    let client = redis::Client::open(redis.config().url()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let hash: HashMap<String, String> = conn.hgetall("12345").await.unwrap();

    assert_eq!(hash.get("customerId").map(String::as_str), Some("1234"));
    assert_eq!(hash.get("valid").map(String::as_str), Some("true"));
    assert!(!hash.contains_key("messageId"));

    token.cancel();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_fetch_missing_delete_and_flush() {
    let redis = TestRedis::new().await;
    let token = CancellationToken::new();
    let store = redis.connected_store(&token).await;

    assert!(store.fetch("missing").await.unwrap().is_none());

    store.store(&sample()).await.unwrap();
    assert!(store.delete("12345").await.unwrap());
    assert!(!store.delete("12345").await.unwrap());

    store.store(&sample()).await.unwrap();
    store.flush_all().await.unwrap();
    assert!(store.fetch("12345").await.unwrap().is_none());

    token.cancel();
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_store_replaces_previous_record() {
    let redis = TestRedis::new().await;
    let token = CancellationToken::new();
    let store = redis.connected_store(&token).await;
    store.store(&sample()).await.unwrap();

    let sparse = TrackingRecord {
        program_name: Some("renamed".to_string()),
        ..TrackingRecord::new("12345")
    };
    store.store(&sparse).await.unwrap();

    let fetched = store.fetch("12345").await.unwrap().unwrap();
    assert_eq!(fetched.program_name.as_deref(), Some("renamed"));
    assert!(fetched.checksum.is_none());
    assert!(fetched.customer_id.is_none());
    assert!(fetched.customer_name.is_none());
    assert!(!fetched.valid);

    token.cancel();
}

struct Recorder {
    seen: Mutex<Vec<Document>>,
}

#[async_trait]
impl Handler for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(&self, message: Message) {
        self.seen.lock().push(message.body().clone());
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_bridge_forwards_notifications() {
    let redis = TestRedis::new().await;
    let token = CancellationToken::new();
    let dispatcher = Dispatcher::default();
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    dispatcher.bind(&[CACHE_REFILL], recorder.clone()).unwrap();

    let bridge = PubSubBridge::new(redis.config(), dispatcher.clone()).unwrap();
    let link = bridge.link();
    bridge.start(token.clone());
    assert!(link.wait_for(LinkState::Connected, Duration::from_secs(10)).await);

    let client = redis::Client::open(redis.config().url()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let envelope = serde_json::json!({"message": sample().to_document().to_string()}).to_string();
    let _: i64 = conn.publish(&redis.config().channel, envelope).await.unwrap();
    let _: i64 = conn
        .publish(&redis.config().channel, r#"{"programId":"777"}"#)
        .await
        .unwrap();

    let mut waited = 0;
    while recorder.seen.lock().len() < 2 && waited < 100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
    }

    let seen = recorder.seen.lock().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0]["programId"], "12345");
    assert_eq!(seen[1]["programId"], "777");

    token.cancel();
    dispatcher.shutdown().await;
}
