//! Bus connection lifecycle callbacks
//!
//! `on_connect` runs on every ConnAck (first connect and every reconnect)
//! and reissues all subscriptions, since none are assumed to survive a
//! reconnect. `on_disconnect` only records the loss; reconnecting is the
//! event loop's job.

use super::connection::ConnectionState;
use crate::transport::BusClient;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Process-wide connection state plus the topics to (re)subscribe
#[derive(Debug)]
pub struct BusLifecycle {
    listen_topics: Vec<String>,
    state_tx: watch::Sender<ConnectionState>,
    disconnect_pending: AtomicBool,
    connect_count: AtomicU32,
}

impl BusLifecycle {
    pub fn new(listen_topics: Vec<String>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            listen_topics,
            state_tx,
            disconnect_pending: AtomicBool::new(false),
            connect_count: AtomicU32::new(0),
        }
    }

    pub fn listen_topics(&self) -> &[String] {
        &self.listen_topics
    }

    /// Connection (or reconnection) succeeded: mark connected, then resubscribe
    pub async fn on_connect<C: BusClient + ?Sized>(&self, client: &C) {
        self.mark_connected();
        self.resubscribe(client).await;
    }

    /// Record a ConnAck. Synchronous so it is ordered with the poll loop.
    pub fn mark_connected(&self) {
        self.state_tx.send_replace(ConnectionState::Connected);
        let count = self.connect_count.fetch_add(1, Ordering::AcqRel) + 1;
        let recovered = self.disconnect_pending.swap(false, Ordering::AcqRel);

        if recovered {
            info!(connects = count, "Reconnected to MQTT broker");
        } else {
            info!(connects = count, "Connected to MQTT broker");
        }
    }

    /// Reissue every listen subscription; failures are logged only
    pub async fn resubscribe<C: BusClient + ?Sized>(&self, client: &C) {
        for topic in &self.listen_topics {
            match client.subscribe(topic).await {
                Ok(()) => info!(topic = %topic, "Subscribed"),
                Err(e) => error!(topic = %topic, error = %e, "Failed to subscribe"),
            }
        }
    }

    /// Connection lost
    pub fn on_disconnect(&self, reason: &str) {
        self.state_tx.send_replace(ConnectionState::Disconnected);
        self.disconnect_pending.store(true, Ordering::Release);
        warn!(reason, "Disconnected from MQTT broker");
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// A disconnect happened and no reconnect has completed since
    pub fn disconnect_pending(&self) -> bool {
        self.disconnect_pending.load(Ordering::Acquire)
    }

    /// Number of successful connects, including reconnects
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::Acquire)
    }

    /// Receiver notified on every state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}
