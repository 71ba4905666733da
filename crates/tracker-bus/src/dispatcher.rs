//! Address-based dispatcher.
//!
//! Every bound handler gets a bounded [`mpsc`] inbox and its own loop task.
//! Requests pair the message with a [`oneshot`] reply channel. Shutdown is
//! coordinated through a shared [`CancellationToken`].

use crate::{BusError, Handler, Message};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use tracker_core::metrics::DispatchMetrics;
use tracker_core::Document;

/// How long shutdown waits for each handler loop to finish.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Dispatcher settings.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherOptions {
    /// Deadline used by [`Dispatcher::request`].
    pub request_timeout: Duration,
    /// Inbox capacity of each handler.
    pub channel_capacity: usize,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            channel_capacity: 1024,
        }
    }
}

/// Cloneable handle to the message dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    routes: RwLock<HashMap<String, mpsc::Sender<Message>>>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    shutdown_token: CancellationToken,
    options: DispatcherOptions,
}

impl Dispatcher {
    #[must_use]
    pub fn new(options: DispatcherOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                routes: RwLock::new(HashMap::new()),
                tasks: Mutex::new(Vec::new()),
                shutdown_token: CancellationToken::new(),
                options,
            }),
        }
    }

    /// Default request deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.inner.options.request_timeout
    }

    /// Binds a handler to a set of addresses and starts its loop.
    ///
    /// All addresses share one inbox, so messages to any of them are handled
    /// in arrival order. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails without binding anything if one of the addresses is taken or
    /// the dispatcher is shutting down.
    pub fn bind(&self, addresses: &[&str], handler: Arc<dyn Handler>) -> Result<(), BusError> {
        if self.inner.shutdown_token.is_cancelled() {
            return Err(BusError::ShuttingDown);
        }

        let (tx, rx) = mpsc::channel(self.inner.options.channel_capacity.max(1));
        {
            let mut routes = self.inner.routes.write();
            if let Some(taken) = addresses.iter().find(|a| routes.contains_key(**a)) {
                return Err(BusError::AlreadyRegistered((*taken).to_string()));
            }
            for address in addresses {
                routes.insert((*address).to_string(), tx.clone());
            }
        }

        let name = handler.name();
        let token = self.inner.shutdown_token.child_token();
        let task = tokio::spawn(handler_loop(handler, rx, token));
        self.inner.tasks.lock().push((name, task));

        info!(handler = name, addresses = ?addresses, "Handler bound");
        Ok(())
    }

    /// Checks whether an address has a handler.
    #[must_use]
    pub fn is_bound(&self, address: &str) -> bool {
        self.inner.routes.read().contains_key(address)
    }

    /// Delivers a message without waiting for a reply.
    ///
    /// # Errors
    ///
    /// `NoHandler` when nothing is bound, `Closed` when the handler loop has
    /// stopped.
    pub async fn send(&self, address: &str, body: Document) -> Result<(), BusError> {
        trace!(address, "send");
        self.deliver(Message::new(address, body, None)).await
    }

    /// Sends a request and waits for the reply with the default deadline.
    pub async fn request(&self, address: &str, body: Document) -> Result<Document, BusError> {
        self.request_with_timeout(address, body, self.inner.options.request_timeout)
            .await
    }

    /// Sends a request and waits for exactly one reply or failure.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`send`](Self::send): `Timeout` when the
    /// deadline passes, `NoReply` when the handler drops the request, or the
    /// failure the handler replied with.
    pub async fn request_with_timeout(
        &self,
        address: &str,
        body: Document,
        timeout: Duration,
    ) -> Result<Document, BusError> {
        trace!(address, ?timeout, "request");
        let (tx, rx) = oneshot::channel();
        self.deliver(Message::new(address, body, Some(tx))).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(BusError::NoReply(address.to_string())),
            Err(_) => {
                DispatchMetrics::timed_out(address);
                debug!(address, ?timeout, "Request timed out");
                Err(BusError::Timeout {
                    address: address.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn deliver(&self, message: Message) -> Result<(), BusError> {
        if self.inner.shutdown_token.is_cancelled() {
            return Err(BusError::ShuttingDown);
        }

        let sender = self
            .inner
            .routes
            .read()
            .get(message.address())
            .cloned()
            .ok_or_else(|| BusError::NoHandler(message.address().to_string()))?;

        sender
            .send(message)
            .await
            .map_err(|e| BusError::Closed(e.0.address().to_string()))
    }

    /// Stops every handler loop and runs their `on_stop` hooks.
    ///
    /// Idempotent. Messages still queued are dropped, so pending requests
    /// resolve with `NoReply`.
    pub async fn shutdown(&self) {
        if self.inner.shutdown_token.is_cancelled() {
            return;
        }
        info!("Shutting down dispatcher");
        self.inner.shutdown_token.cancel();
        self.inner.routes.write().clear();

        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        let stops = tasks.into_iter().map(|(name, task)| async move {
            match tokio::time::timeout(STOP_TIMEOUT, task).await {
                Ok(Ok(())) => debug!(handler = name, "Handler stopped"),
                Ok(Err(e)) => warn!(handler = name, error = %e, "Handler task failed"),
                Err(_) => warn!(handler = name, "Handler stop timed out"),
            }
        });
        join_all(stops).await;

        info!("Dispatcher shutdown complete");
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown_token.is_cancelled()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherOptions::default())
    }
}

async fn handler_loop(
    handler: Arc<dyn Handler>,
    mut rx: mpsc::Receiver<Message>,
    token: CancellationToken,
) {
    let name = handler.name();
    debug!(handler = name, "Handler loop started");

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => handler.handle(message).await,
                None => break,
            },
        }
    }

    handler.on_stop().await;
    debug!(handler = name, "Handler loop stopped");
}
