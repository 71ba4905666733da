//! Messages and reply handles.

use crate::BusError;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::trace;
use tracker_core::Document;

pub(crate) type ReplySender = oneshot::Sender<Result<Document, BusError>>;

/// A message delivered to a handler.
#[derive(Debug)]
pub struct Message {
    address: String,
    body: Document,
    replier: Replier,
}

impl Message {
    pub(crate) fn new(address: impl Into<String>, body: Document, reply_to: Option<ReplySender>) -> Self {
        Self {
            address: address.into(),
            body,
            replier: Replier { reply_to },
        }
    }

    /// Address the message was sent to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn body(&self) -> &Document {
        &self.body
    }

    /// Whether the sender is waiting for a reply.
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.replier.expects_reply()
    }

    /// Decodes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        <T as serde::Deserialize>::deserialize(&self.body).map_err(|e| BusError::Codec(e.to_string()))
    }

    /// Replies with a document. No-op for fire-and-forget messages.
    pub fn reply(self, body: Document) {
        self.replier.reply(body);
    }

    /// Fails the request. No-op for fire-and-forget messages.
    pub fn fail(self, error: BusError) {
        self.replier.fail(error);
    }

    /// Splits the message so the reply can be sent from another task.
    #[must_use]
    pub fn into_parts(self) -> (String, Document, Replier) {
        (self.address, self.body, self.replier)
    }
}

/// One-shot reply handle for a message.
///
/// Dropping it without replying makes the requester see
/// [`BusError::NoReply`].
#[derive(Debug)]
pub struct Replier {
    reply_to: Option<ReplySender>,
}

impl Replier {
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    pub fn reply(self, body: Document) {
        self.complete(Ok(body));
    }

    pub fn fail(self, error: BusError) {
        self.complete(Err(error));
    }

    fn complete(self, result: Result<Document, BusError>) {
        if let Some(tx) = self.reply_to {
            if tx.send(result).is_err() {
                // requester already gave up
                trace!("Reply dropped, requester is gone");
            }
        }
    }
}
