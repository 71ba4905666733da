use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::USER_AGENT, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tracker_bus::{BusError, Dispatcher, DispatcherOptions, Handler, Message};
use tracker_config::{ObservabilityConfig, ServerConfig};
use tracker_core::addresses::{
    CACHE_PURGE, CACHE_STORE, RESOLVE, STORE_DELETE, STORE_PURGE, STORE_WRITE, STREAM_PUBLISH,
};
use tracker_core::{not_found, DeleteOutcome, DeleteRequest, ResolveRequest, TrackingRecord};
use tracker_rest::{create_router, AppState};

/// Answers resolves for one known program id and records everything else.
struct FakePipeline {
    known: TrackingRecord,
    seen: Mutex<Vec<(String, Value)>>,
    fail_resolve: bool,
}

impl FakePipeline {
    fn seen_at(&self, address: &str) -> Vec<Value> {
        self.seen
            .lock()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl Handler for FakePipeline {
    fn name(&self) -> &'static str {
        "fake-pipeline"
    }

    async fn handle(&self, message: Message) {
        let (address, body, replier) = message.into_parts();
        self.seen.lock().push((address.clone(), body.clone()));

        match address.as_str() {
            RESOLVE if self.fail_resolve => replier.fail(BusError::Failed("store down".to_string())),
            RESOLVE => {
                let request = ResolveRequest::from_document(&body).unwrap();
                if request.program_id == self.known.program_id {
                    let mut record = self.known.clone();
                    record.message_id = request.message_id;
                    replier.reply(record.to_document());
                } else {
                    replier.reply(not_found());
                }
            }
            STORE_DELETE => {
                let request: DeleteRequest = serde_json::from_value(body).unwrap();
                replier.reply(
                    DeleteOutcome {
                        deleted: request.program_id == self.known.program_id,
                        program_id: request.program_id,
                    }
                    .to_document(),
                );
            }
            _ => replier.reply(Value::Null),
        }
    }
}

fn known_record() -> TrackingRecord {
    TrackingRecord {
        program_name: Some("myProgram".to_string()),
        customer_id: Some(1234),
        valid: true,
        ..TrackingRecord::new("12345")
    }
}

fn setup_with(fail_resolve: bool, fill_path: &str) -> (Router, Arc<FakePipeline>) {
    let dispatcher = Dispatcher::default();
    let fake = Arc::new(FakePipeline {
        known: known_record(),
        seen: Mutex::new(Vec::new()),
        fail_resolve,
    });
    dispatcher
        .bind(
            &[RESOLVE, STORE_DELETE, STREAM_PUBLISH, CACHE_STORE, STORE_WRITE, CACHE_PURGE, STORE_PURGE],
            fake.clone(),
        )
        .unwrap();

    let router = create_router(
        AppState::new(dispatcher, fill_path),
        &ServerConfig::default(),
        &ObservabilityConfig::default(),
    );
    (router, fake)
}

fn setup() -> (Router, Arc<FakePipeline>) {
    setup_with(false, "does/not/exist.json")
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .header(USER_AGENT, "myUserAgent")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Publishes are fire-and-forget; a trailing request through the same
/// handler loop guarantees they were processed.
async fn flush(fake: &FakePipeline, router: Router) {
    let _ = get(router, "/event/delete/flush").await;
    assert!(!fake.seen_at(STORE_DELETE).is_empty());
}

/// The publish hand-off runs in its own task, so its arrival is polled.
async fn wait_for(fake: &FakePipeline, address: &str, count: usize) -> Vec<Value> {
    let mut attempts = 0;
    while fake.seen_at(address).len() < count && attempts < 200 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        attempts += 1;
    }
    fake.seen_at(address)
}

/// Accepts one message and then never finishes handling it.
struct StuckPublisher;

#[async_trait]
impl Handler for StuckPublisher {
    fn name(&self) -> &'static str {
        "stuck-publisher"
    }

    async fn handle(&self, _message: Message) {
        std::future::pending::<()>().await;
    }
}

#[tokio::test]
async fn test_saturated_publisher_does_not_delay_response() {
    let dispatcher = Dispatcher::new(DispatcherOptions {
        channel_capacity: 1,
        ..DispatcherOptions::default()
    });
    let fake = Arc::new(FakePipeline {
        known: known_record(),
        seen: Mutex::new(Vec::new()),
        fail_resolve: false,
    });
    dispatcher.bind(&[RESOLVE], fake).unwrap();
    dispatcher.bind(&[STREAM_PUBLISH], Arc::new(StuckPublisher)).unwrap();

    // one message parked in the handler, one filling the inbox
    dispatcher.send(STREAM_PUBLISH, json!({})).await.unwrap();
    dispatcher.send(STREAM_PUBLISH, json!({})).await.unwrap();

    let router = create_router(
        AppState::new(dispatcher, "unused.json"),
        &ServerConfig::default(),
        &ObservabilityConfig::default(),
    );
    let (status, body) = tokio::time::timeout(Duration::from_secs(1), get(router, "/event/12345"))
        .await
        .expect("response waited on the publisher");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["programId"], "12345");
}

#[tokio::test]
async fn test_track_known_event() {
    let (router, fake) = setup();
    let (status, body) = get(router.clone(), "/event/12345").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["programId"], "12345");
    assert_eq!(body["programName"], "myProgram");
    assert_eq!(body["userAgent"], "myUserAgent");
    let message_id = body["messageId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(message_id).is_ok());

    let published = wait_for(&fake, STREAM_PUBLISH, 1).await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0]["userAgent"], "myUserAgent");
    assert_eq!(published[0]["messageId"], message_id);
}

#[tokio::test]
async fn test_each_request_gets_a_fresh_message_id() {
    let (router, fake) = setup();
    get(router.clone(), "/event/12345").await;
    get(router.clone(), "/event/12345").await;

    let resolves = fake.seen_at(RESOLVE);
    assert_ne!(resolves[0]["messageId"], resolves[1]["messageId"]);
}

#[tokio::test]
async fn test_unknown_event_is_404() {
    let (router, fake) = setup();
    let (status, body) = get(router.clone(), "/event/99999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!("ProgramId not found"));

    flush(&fake, router).await;
    assert!(fake.seen_at(STREAM_PUBLISH).is_empty());
}

#[tokio::test]
async fn test_missing_or_blank_id_is_400() {
    let (router, fake) = setup();
    assert_eq!(get(router.clone(), "/event/").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(router.clone(), "/event/%20%20").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(router, "/event/delete/").await.0, StatusCode::BAD_REQUEST);
    assert!(fake.seen_at(RESOLVE).is_empty());
}

#[tokio::test]
async fn test_dispatch_failure_is_500() {
    let (router, _) = setup_with(true, "unused.json");
    let (status, body) = get(router, "/event/12345").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DISPATCH_ERROR");
    assert!(body["message"].as_str().unwrap().contains("store down"));
}

#[tokio::test]
async fn test_delete_event() {
    let (router, _) = setup();
    let (status, body) = get(router.clone(), "/event/delete/12345").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"programId": "12345", "deleted": true}));

    let (_, body) = get(router, "/event/delete/777").await;
    assert_eq!(body["deleted"], false);
}

#[tokio::test]
async fn test_fill_sends_valid_records_to_cache_and_store() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!([
            {"programId": "1", "programName": "one"},
            {"programName": "no id"},
            {"programId": "2", "valid": true}
        ])
    )
    .unwrap();

    let (router, fake) = setup_with(false, file.path().to_str().unwrap());
    let (status, body) = get(router.clone(), "/cache/fill").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"records": 2}));

    flush(&fake, router).await;
    assert_eq!(fake.seen_at(CACHE_STORE).len(), 2);
    assert_eq!(fake.seen_at(STORE_WRITE).len(), 2);
    assert_eq!(fake.seen_at(STORE_WRITE)[1]["programId"], "2");
}

#[tokio::test]
async fn test_fill_with_unreadable_file_is_500() {
    let (router, fake) = setup();
    let (status, _) = get(router, "/cache/fill").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(fake.seen_at(CACHE_STORE).is_empty());
}

#[tokio::test]
async fn test_purge_reaches_store_and_cache() {
    let (router, fake) = setup();
    let (status, _) = get(router.clone(), "/cache/purge").await;
    assert_eq!(status, StatusCode::OK);

    flush(&fake, router).await;
    assert_eq!(fake.seen_at(STORE_PURGE).len(), 1);
    assert_eq!(fake.seen_at(CACHE_PURGE).len(), 1);
}

#[tokio::test]
async fn test_health_check() {
    let (router, _) = setup();
    let (status, body) = get(router, "/health/check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_without_recorder_is_404() {
    let (router, _) = setup();
    assert_eq!(get(router, "/metrics").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_renders_recorder() {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let state = AppState::new(Dispatcher::default(), "unused.json").with_metrics(recorder.handle());
    let router = create_router(state, &ServerConfig::default(), &ObservabilityConfig::default());

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
