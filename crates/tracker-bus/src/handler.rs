//! Handler trait bound to dispatcher addresses.

use crate::Message;
use async_trait::async_trait;

/// A component that processes messages for one or more addresses.
///
/// `handle` runs inside the handler's loop: while it is awaited no other
/// message for this handler is processed. Network I/O belongs in a spawned
/// task that answers through the message's [`crate::Replier`].
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Processes one message.
    async fn handle(&self, message: Message);

    /// Called once when the dispatcher shuts down.
    async fn on_stop(&self) {}
}
