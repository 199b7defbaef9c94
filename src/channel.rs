//! Channel manager: the single outbound connection to the collector.
//!
//! The manager owns connectivity. It runs an independent reconnect loop,
//! publishes every status transition, and hands out the client tied to the
//! current connection. Status and client are published together as one
//! immutable snapshot, so a subscriber can never observe `Connected` with a
//! stale or absent handle.

use crate::client::{CollectorClient, TcpCollectorClient};
use crate::config::CollectorConfig;
use crate::task::{spawn_periodic, PeriodicTask};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Connectivity state of the collector channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connected,
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Snapshot of channel status and the client handle bound to it.
///
/// `client` is `Some` exactly when `status` is [`ChannelStatus::Connected`];
/// the pair is replaced as a unit on every transition.
#[derive(Clone)]
pub struct ChannelState {
    pub status: ChannelStatus,
    client: Option<Arc<dyn CollectorClient>>,
}

impl ChannelState {
    fn disconnected() -> Self {
        Self {
            status: ChannelStatus::Disconnected,
            client: None,
        }
    }

    /// The client bound to the current connection, if connected.
    pub fn client(&self) -> Option<Arc<dyn CollectorClient>> {
        self.client.clone()
    }
}

impl std::fmt::Debug for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelState")
            .field("status", &self.status)
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

/// A status-change subscription. New subscribers immediately observe the
/// manager's current state; every later transition is delivered through the
/// same receiver.
pub type ChannelWatch = watch::Receiver<ChannelState>;

/// Maintains one usable connection to the configured collector endpoint.
///
/// Connection attempts that fail are logged and retried on the next
/// scheduled tick; a broken channel is never fatal to the process.
pub struct ChannelManager {
    config: CollectorConfig,
    state_tx: watch::Sender<ChannelState>,
    needs_reconnect: AtomicBool,
}

impl ChannelManager {
    /// Creates a manager starting in the disconnected state. No connection
    /// is attempted until the reconnect loop is started.
    pub fn new(config: CollectorConfig) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::disconnected());
        Self {
            config,
            state_tx,
            needs_reconnect: AtomicBool::new(true),
        }
    }

    /// Registers a listener for status transitions.
    pub fn subscribe(&self) -> ChannelWatch {
        self.state_tx.subscribe()
    }

    /// The current published state.
    pub fn current(&self) -> ChannelState {
        self.state_tx.borrow().clone()
    }

    /// Marks the channel broken so the next reconnect tick replaces it.
    ///
    /// Called by senders after a failed `collect`; the failed batch itself
    /// is already discarded by then.
    pub fn report_failure(&self) {
        if !self.needs_reconnect.swap(true, Ordering::SeqCst) {
            warn!(endpoint = %self.config.endpoint, "collector channel reported broken");
            self.publish(ChannelState::disconnected());
        }
    }

    /// Starts the reconnect loop on its own worker.
    pub fn start(self: &Arc<Self>) -> PeriodicTask {
        let manager = Arc::clone(self);
        spawn_periodic(
            "channel-reconnect",
            self.config.reconnect_interval,
            move || {
                let manager = Arc::clone(&manager);
                async move {
                    manager.reconnect_tick().await;
                    Ok(())
                }
            },
        )
    }

    /// One pass of the reconnect loop: connect if not already connected.
    pub(crate) async fn reconnect_tick(&self) {
        if !self.needs_reconnect.load(Ordering::SeqCst) {
            return;
        }

        debug!(endpoint = %self.config.endpoint, "attempting collector connection");
        match timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.endpoint),
        )
        .await
        {
            Ok(Ok(stream)) => {
                let client: Arc<dyn CollectorClient> = Arc::new(TcpCollectorClient::new(
                    stream,
                    self.config.max_frame_len,
                    self.config.io_timeout,
                ));
                self.publish_connected(client);
                info!(endpoint = %self.config.endpoint, "collector channel established");
            }
            Ok(Err(err)) => {
                warn!(endpoint = %self.config.endpoint, error = %err, "collector connection failed");
                self.publish_disconnected_if_needed();
            }
            Err(_) => {
                warn!(endpoint = %self.config.endpoint, "collector connection timed out");
                self.publish_disconnected_if_needed();
            }
        }
    }

    /// Publishes a connected state carrying the client bound to a fresh
    /// connection. Crate tests use this path to stand in a mock transport.
    pub(crate) fn publish_connected(&self, client: Arc<dyn CollectorClient>) {
        self.needs_reconnect.store(false, Ordering::SeqCst);
        self.publish(ChannelState {
            status: ChannelStatus::Connected,
            client: Some(client),
        });
    }

    fn publish_disconnected_if_needed(&self) {
        if self.state_tx.borrow().status != ChannelStatus::Disconnected {
            self.publish(ChannelState::disconnected());
        }
    }

    fn publish(&self, state: ChannelState) {
        // send_replace publishes even with zero subscribers; late
        // subscribers pick up the latest value on subscribe.
        let _ = self.state_tx.send_replace(state);
    }
}
