//! Dispatcher-facing backing store component.

use crate::RecordStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracker_bus::{BusError, Dispatcher, Handler, Message};
use tracker_core::addresses::{STORE_DELETE, STORE_FETCH, STORE_PURGE, STORE_WRITE};
use tracker_core::{not_found, DeleteOutcome, DeleteRequest, ResolveRequest, TrackingRecord};

/// Serves fetch, write, purge and delete against a [`RecordStore`].
///
/// Every store call runs in a spawned task so the loop never waits on the
/// network. As a consequence a write and a later fetch of the same key are
/// not ordered.
pub struct StoreHandler {
    store: Arc<dyn RecordStore>,
}

impl StoreHandler {
    /// Addresses served by this component.
    pub const ADDRESSES: [&'static str; 4] = [STORE_FETCH, STORE_WRITE, STORE_PURGE, STORE_DELETE];

    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Creates the handler and binds it.
    pub fn bind(store: Arc<dyn RecordStore>, dispatcher: &Dispatcher) -> Result<(), BusError> {
        dispatcher.bind(&Self::ADDRESSES, Arc::new(Self::new(store)))
    }

    fn on_fetch(&self, message: Message) {
        let request = match ResolveRequest::from_document(message.body()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting undecodable fetch request");
                message.fail(BusError::Codec(e.to_string()));
                return;
            }
        };

        let store = self.store.clone();
        let (_, _, replier) = message.into_parts();
        tokio::spawn(async move {
            match store.fetch(&request.program_id).await {
                Ok(Some(mut record)) => {
                    record.message_id.clone_from(&request.message_id);
                    replier.reply(record.to_document());
                }
                Ok(None) => replier.reply(not_found()),
                Err(e) => {
                    debug!(program_id = %request.program_id, error = %e, "Fetch failed");
                    replier.fail(BusError::Failed(e.to_string()));
                }
            }
        });
    }

    fn on_write(&self, message: Message) {
        let record = match TrackingRecord::from_document(message.body()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable record");
                message.fail(BusError::Codec(e.to_string()));
                return;
            }
        };

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.store(&record).await {
                warn!(program_id = %record.program_id, error = %e, "Store write failed");
            }
        });
    }

    fn on_purge(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            match store.flush_all().await {
                Ok(()) => info!("Backing store flushed"),
                Err(e) => warn!(error = %e, "Backing store flush failed"),
            }
        });
    }

    fn on_delete(&self, message: Message) {
        let request = match DeleteRequest::from_document(message.body()) {
            Ok(request) => request,
            Err(e) => {
                message.fail(BusError::Codec(e.to_string()));
                return;
            }
        };

        let store = self.store.clone();
        let (_, _, replier) = message.into_parts();
        tokio::spawn(async move {
            match store.delete(&request.program_id).await {
                Ok(deleted) => {
                    info!(program_id = %request.program_id, deleted, "Record deleted");
                    replier.reply(
                        DeleteOutcome {
                            program_id: request.program_id,
                            deleted,
                        }
                        .to_document(),
                    );
                }
                Err(e) => {
                    warn!(program_id = %request.program_id, error = %e, "Delete failed");
                    replier.fail(BusError::Failed(e.to_string()));
                }
            }
        });
    }
}

#[async_trait]
impl Handler for StoreHandler {
    fn name(&self) -> &'static str {
        "backing-store"
    }

    async fn handle(&self, message: Message) {
        match message.address() {
            STORE_FETCH => self.on_fetch(message),
            STORE_WRITE => self.on_write(message),
            STORE_PURGE => self.on_purge(),
            STORE_DELETE => self.on_delete(message),
            other => warn!(address = other, "Unexpected address"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;
    use serde_json::json;
    use std::time::Duration;
    use tracker_core::is_not_found;

    fn setup(records: Vec<TrackingRecord>) -> (Dispatcher, Arc<InMemoryRecordStore>) {
        let dispatcher = Dispatcher::default();
        let store = Arc::new(InMemoryRecordStore::with_records(records));
        StoreHandler::bind(store.clone(), &dispatcher).unwrap();
        (dispatcher, store)
    }

    #[tokio::test]
    async fn test_fetch_overwrites_message_id() {
        let record = TrackingRecord {
            program_name: Some("myProgram".to_string()),
            ..TrackingRecord::new("12345")
        };
        let (dispatcher, _) = setup(vec![record]);

        let reply = dispatcher
            .request(STORE_FETCH, ResolveRequest::new("12345", "m1").to_document())
            .await
            .unwrap();
        assert_eq!(reply["messageId"], "m1");
        assert_eq!(reply["programName"], "myProgram");
    }

    #[tokio::test]
    async fn test_fetch_unknown_is_empty() {
        let (dispatcher, _) = setup(vec![]);
        let reply = dispatcher
            .request(STORE_FETCH, ResolveRequest::new("nope", "m1").to_document())
            .await
            .unwrap();
        assert!(is_not_found(&reply));
    }

    #[tokio::test]
    async fn test_fetch_fails_when_offline() {
        let (dispatcher, store) = setup(vec![TrackingRecord::new("1")]);
        store.set_available(false);

        let err = dispatcher
            .request(STORE_FETCH, ResolveRequest::new("1", "m1").to_document())
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Failed(_)));
    }

    #[tokio::test]
    async fn test_write_then_delete() {
        let (dispatcher, store) = setup(vec![]);
        dispatcher
            .send(STORE_WRITE, TrackingRecord::new("5").to_document())
            .await
            .unwrap();

        let mut attempts = 0;
        while store.is_empty() && attempts < 50 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            attempts += 1;
        }
        assert_eq!(store.len(), 1);

        let reply = dispatcher
            .request(STORE_DELETE, DeleteRequest::new("5").to_document())
            .await
            .unwrap();
        assert_eq!(reply, json!({"programId": "5", "deleted": true}));

        let reply = dispatcher
            .request(STORE_DELETE, DeleteRequest::new("5").to_document())
            .await
            .unwrap();
        assert_eq!(reply["deleted"], false);
    }

    #[tokio::test]
    async fn test_undecodable_fetch_fails() {
        let (dispatcher, _) = setup(vec![]);
        let err = dispatcher.request(STORE_FETCH, json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, BusError::Codec(_)));
    }
}
