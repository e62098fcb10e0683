//! Subscription channel.
//!
//! A long-lived, auto-reconnecting reader of a server-sent event stream.
//! Frames are demultiplexed by event name; the channel keeps the latest
//! decoded payload and a sequence counter per name and notifies listeners
//! registered for that name.
//!
//! # Timeline
//!
//! ```text
//! socket ──→ SseDecoder ──→ ChannelCore::process_frame ──→ state + listeners
//!              (driver task, one frame at a time)
//! ```
//!
//! Listeners run synchronously on the driver task; a slow listener delays
//! the frames behind it.

mod connection;
mod dispatch;
mod error;
mod listeners;
mod state;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{Config, SecureString};
use crate::sse::SseFrame;

use self::dispatch::ChannelCore;

pub use error::ChannelError;
pub use listeners::{ListenerId, Update};
pub use state::ChannelState;

/// Connection lifecycle as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Settings for a [`Channel`], derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub url: String,
    pub with_credentials: bool,
    pub credential: Option<SecureString>,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    pub connect_timeout: Duration,
    pub reset_event: String,
}

impl From<&Config> for SubscriptionConfig {
    fn from(config: &Config) -> Self {
        let sub = &config.subscription;
        Self {
            url: config.endpoints.events_url.clone(),
            with_credentials: sub.with_credentials,
            credential: config.endpoints.credential.clone(),
            reconnect_initial: Duration::from_millis(sub.reconnect_initial_ms),
            reconnect_max: Duration::from_millis(sub.reconnect_max_ms),
            connect_timeout: Duration::from_secs(sub.connect_timeout_seconds as u64),
            reset_event: sub.reset_event.clone(),
        }
    }
}

/// A live subscription to an event stream.
pub struct Channel {
    core: Arc<ChannelCore>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    /// Open the stream at `config.url` on the current tokio runtime.
    ///
    /// Returns immediately; the connection is established in the background.
    pub fn open(config: SubscriptionConfig) -> Self {
        let core = ChannelCore::new(config.reset_event.clone());
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let status_tx = Arc::new(status_tx);
        let (shutdown, shutdown_rx) = watch::channel(false);

        tracing::info!(url = %config.url, "Opening subscription channel");
        let task = tokio::spawn(connection::run(
            core.clone(),
            config,
            status_tx.clone(),
            shutdown_rx,
        ));

        Self {
            core,
            status_tx,
            status_rx,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// A channel with no network connection, fed through the returned
    /// [`ManualFeed`]. The feed is the channel's only writer.
    pub fn manual(reset_event: impl Into<String>) -> (Self, ManualFeed) {
        let core = ChannelCore::new(reset_event);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Open);
        let status_tx = Arc::new(status_tx);
        let (shutdown, _) = watch::channel(false);

        let feed = ManualFeed {
            core: core.clone(),
            status: status_tx.clone(),
        };
        let channel = Self {
            core,
            status_tx,
            status_rx,
            shutdown,
            task: Mutex::new(None),
        };
        (channel, feed)
    }

    /// Latest payload for `event`, or `None` if nothing has arrived yet.
    pub fn latest(&self, event: &str) -> Option<Value> {
        self.core.latest(event)
    }

    /// Number of values accepted for `event` since open or the last reset.
    pub fn sequence(&self, event: &str) -> u64 {
        self.core.sequence(event)
    }

    /// Latest payload for `event` together with its sequence, read at once.
    pub fn current(&self, event: &str) -> Option<Update> {
        self.core.current(event)
    }

    /// Event names currently holding a value.
    pub fn event_names(&self) -> Vec<String> {
        self.core.event_names()
    }

    /// Event names with at least one update listener.
    pub fn observed_events(&self) -> Vec<String> {
        self.core.observed_events()
    }

    /// Register `callback` for changes to `event`.
    ///
    /// Returns `None` if the channel is already closed.
    pub fn on_update<F>(&self, event: &str, callback: F) -> Option<ListenerId>
    where
        F: Fn(&Update) + Send + Sync + 'static,
    {
        self.core.on_update(event, Arc::new(callback))
    }

    /// Register an observer for non-fatal errors.
    pub fn on_error<F>(&self, callback: F) -> Option<ListenerId>
    where
        F: Fn(&ChannelError) + Send + Sync + 'static,
    {
        self.core.on_error(Arc::new(callback))
    }

    /// Register an observer for stream resets.
    pub fn on_reset<F>(&self, callback: F) -> Option<ListenerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.core.on_reset(Arc::new(callback))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.core.remove_listener(id)
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// A receiver that observes every status change.
    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Wait until the stream is open. Returns false on timeout or close.
    pub async fn wait_until_open(&self, timeout: Duration) -> bool {
        let mut rx = self.status_rx.clone();
        let opened = tokio::time::timeout(
            timeout,
            rx.wait_for(|s| matches!(s, ConnectionStatus::Open | ConnectionStatus::Closed)),
        )
        .await;
        matches!(opened, Ok(Ok(status)) if *status == ConnectionStatus::Open)
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Tear down the connection and release every registration.
    ///
    /// No callback fires after this returns.
    pub fn close(&self) {
        if self.core.is_closed() {
            return;
        }
        self.core.close();
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.status_tx.send_replace(ConnectionStatus::Closed);
        tracing::info!("Subscription channel closed");
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writer half of [`Channel::manual`].
pub struct ManualFeed {
    core: Arc<ChannelCore>,
    status: Arc<watch::Sender<ConnectionStatus>>,
}

impl ManualFeed {
    /// Process one frame on the caller's thread.
    pub fn push(&self, frame: SseFrame) {
        self.core.process_frame(&frame);
    }

    /// Report a connection drop; stored values are kept.
    pub fn disconnect(&self) {
        if !self.core.is_closed() {
            self.status.send_replace(ConnectionStatus::Reconnecting);
        }
    }

    /// Report that the connection is back.
    pub fn reconnect(&self) {
        if !self.core.is_closed() {
            self.status.send_replace(ConnectionStatus::Open);
        }
    }
}
