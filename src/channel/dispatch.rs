//! The channel's single dispatch timeline.
//!
//! Every frame goes through [`ChannelCore::process_frame`], which decodes it,
//! updates [`ChannelState`] and notifies listeners before the next frame is
//! looked at. Only the connection driver (or a manual feed) calls it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;

use super::error::ChannelError;
use super::listeners::{
    ErrorCallback, ListenerId, Registry, ResetCallback, Update, UpdateCallback,
};
use super::state::ChannelState;
use crate::codec;
use crate::sse::SseFrame;

pub(crate) struct ChannelCore {
    state: Mutex<ChannelState>,
    registry: Mutex<Registry>,
    /// Held for the whole of a dispatch; `close` takes it so no callback can
    /// still be running once `close` returns. Reentrant so a listener may
    /// close its own channel.
    gate: ReentrantMutex<()>,
    closed: AtomicBool,
    reset_event: String,
}

impl ChannelCore {
    pub(crate) fn new(reset_event: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChannelState::new()),
            registry: Mutex::new(Registry::default()),
            gate: ReentrantMutex::new(()),
            closed: AtomicBool::new(false),
            reset_event: reset_event.into(),
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn latest(&self, event: &str) -> Option<Value> {
        self.state.lock().latest(event)
    }

    pub(crate) fn sequence(&self, event: &str) -> u64 {
        self.state.lock().sequence(event)
    }

    pub(crate) fn current(&self, event: &str) -> Option<Update> {
        let state = self.state.lock();
        state.latest(event).map(|value| Update {
            event: event.to_string(),
            value,
            sequence: state.sequence(event),
        })
    }

    pub(crate) fn event_names(&self) -> Vec<String> {
        self.state.lock().event_names()
    }

    pub(crate) fn observed_events(&self) -> Vec<String> {
        self.registry.lock().observed_events()
    }

    pub(crate) fn on_update(&self, event: &str, callback: UpdateCallback) -> Option<ListenerId> {
        let mut registry = self.registry.lock();
        if self.is_closed() {
            return None;
        }
        Some(registry.add_update(event, callback))
    }

    pub(crate) fn on_error(&self, callback: ErrorCallback) -> Option<ListenerId> {
        let mut registry = self.registry.lock();
        if self.is_closed() {
            return None;
        }
        Some(registry.add_error(callback))
    }

    pub(crate) fn on_reset(&self, callback: ResetCallback) -> Option<ListenerId> {
        let mut registry = self.registry.lock();
        if self.is_closed() {
            return None;
        }
        Some(registry.add_reset(callback))
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) -> bool {
        self.registry.lock().remove(id)
    }

    /// Decode one frame, update state, notify listeners.
    pub(crate) fn process_frame(&self, frame: &SseFrame) {
        let _gate = self.gate.lock();
        if self.is_closed() {
            return;
        }

        if frame.event == self.reset_event {
            self.apply_reset();
            return;
        }

        let value = match codec::decode_payload(&frame.event, &frame.data) {
            Ok(value) => value,
            Err(source) => {
                tracing::warn!(event = %frame.event, error = %source, "Dropping undecodable message");
                self.notify_error(&ChannelError::Decode {
                    event: frame.event.clone(),
                    source,
                });
                return;
            }
        };

        let sequence = self.state.lock().apply(&frame.event, value.clone());
        tracing::debug!(event = %frame.event, sequence, "Channel state updated");

        let update = Update {
            event: frame.event.clone(),
            value,
            sequence,
        };
        let listeners = self.registry.lock().updates_for(&frame.event);
        for (id, callback) in listeners {
            if !self.still_registered(id) {
                continue;
            }
            callback(&update);
        }
    }

    /// Report a non-fatal error to the error observers.
    pub(crate) fn report_error(&self, error: &ChannelError) {
        let _gate = self.gate.lock();
        if self.is_closed() {
            return;
        }
        self.notify_error(error);
    }

    pub(crate) fn close(&self) {
        let _gate = self.gate.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.lock().clear();
    }

    fn apply_reset(&self) {
        tracing::info!("Stream reset signalled; clearing channel state");
        self.state.lock().reset();
        let observers = self.registry.lock().resets();
        for (id, callback) in observers {
            if !self.still_registered(id) {
                continue;
            }
            callback();
        }
    }

    fn notify_error(&self, error: &ChannelError) {
        let observers = self.registry.lock().errors();
        for (id, callback) in observers {
            if !self.still_registered(id) {
                continue;
            }
            callback(error);
        }
    }

    /// A listener may close the channel or unregister a later listener
    /// while a dispatch is in progress.
    fn still_registered(&self, id: ListenerId) -> bool {
        !self.is_closed() && self.registry.lock().contains(id)
    }
}
