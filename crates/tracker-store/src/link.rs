//! Connection lifecycle tracking.

use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tracker_core::{TrackerError, TrackerResult};

/// State of one backing store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Observable `Disconnected -> Connecting -> Connected` state machine.
///
/// Commands consult it before touching the network so they fail fast
/// while a reconnect is in progress.
#[derive(Debug)]
pub struct ConnectionLink {
    name: &'static str,
    state: watch::Sender<LinkState>,
}

impl ConnectionLink {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self { name, state }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Fails with `StoreUnavailable` unless the connection is established.
    pub fn ensure_connected(&self) -> TrackerResult<()> {
        match self.state() {
            LinkState::Connected => Ok(()),
            state => Err(TrackerError::StoreUnavailable(format!(
                "{} connection is {}",
                self.name, state
            ))),
        }
    }

    pub(crate) fn set(&self, state: LinkState) {
        self.state.send_replace(state);
    }

    /// Marks an established connection as lost.
    ///
    /// Returns `true` only for the caller that observed the transition, so
    /// a burst of failing commands triggers a single reconnect.
    pub fn mark_lost(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == LinkState::Connected {
                *state = LinkState::Disconnected;
                true
            } else {
                false
            }
        })
    }

    /// Waits until the link reaches `target`, up to `timeout`.
    pub async fn wait_for(&self, target: LinkState, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|state| *state == target))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false)
    }
}
