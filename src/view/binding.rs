//! Glue between a [`Channel`], the view reducer and the publish client.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::channel::{Channel, ListenerId};
use crate::publish::PublishClient;
use crate::view::mvi::Reducer;
use crate::view::state::{ViewIntent, ViewReducer, ViewState};

/// A view bound to one event name on a channel.
///
/// Channel callbacks only enqueue intents; the owner of the binding drains
/// the queue with [`next_intent`](Self::next_intent) and applies each one,
/// so all state changes happen on the render loop.
pub struct ViewBinding {
    state: ViewState,
    publisher: PublishClient,
    intents_tx: mpsc::UnboundedSender<ViewIntent>,
    intents_rx: mpsc::UnboundedReceiver<ViewIntent>,
    listeners: Vec<ListenerId>,
}

impl ViewBinding {
    /// Register on `channel` for `event_name` and seed the state from the
    /// channel's current value.
    pub fn bind(
        channel: &Channel,
        publisher: PublishClient,
        event_name: &str,
        field: &str,
    ) -> Self {
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();

        // Register before seeding so nothing dispatched in between is lost.
        // Broadcasts queued up to the seeded sequence are dropped by the reducer.
        let mut listeners = Vec::new();
        let tx = intents_tx.clone();
        if let Some(id) = channel.on_update(event_name, move |update| {
            let _ = tx.send(ViewIntent::Broadcast {
                value: update.value.clone(),
                sequence: update.sequence,
            });
        }) {
            listeners.push(id);
        }
        let tx = intents_tx.clone();
        if let Some(id) = channel.on_reset(move || {
            let _ = tx.send(ViewIntent::Reset);
        }) {
            listeners.push(id);
        }

        let mut state = ViewState::new(event_name, field);
        state.connection = channel.status();
        if let Some(current) = channel.current(event_name) {
            state = ViewReducer::reduce(
                state,
                ViewIntent::Broadcast {
                    value: current.value,
                    sequence: current.sequence,
                },
            );
        }

        tracing::debug!(event = %event_name, field = %field, "View bound to channel");
        Self {
            state,
            publisher,
            intents_tx,
            intents_rx,
            listeners,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Sender for intents produced outside the channel (keyboard, status).
    pub fn sender(&self) -> mpsc::UnboundedSender<ViewIntent> {
        self.intents_tx.clone()
    }

    /// Wait for the next queued intent.
    pub async fn next_intent(&mut self) -> Option<ViewIntent> {
        self.intents_rx.recv().await
    }

    pub fn try_next_intent(&mut self) -> Option<ViewIntent> {
        self.intents_rx.try_recv().ok()
    }

    /// Apply `intent` and start any publish it produced.
    ///
    /// Returns true if the visible state changed.
    pub fn apply(&mut self, intent: ViewIntent) -> bool {
        let previous = self.state.clone();
        self.state = ViewReducer::reduce(previous.clone(), intent);
        if let Some(submission) = self.state.take_submission() {
            self.spawn_publish(submission);
        }
        self.state != previous
    }

    fn spawn_publish(&self, submission: String) {
        let tx = self.intents_tx.clone();
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::error!("Cannot publish outside an async runtime");
                let _ = tx.send(ViewIntent::PublishFailed("no async runtime".to_string()));
                return;
            }
        };

        let client = self.publisher.clone();
        let event = self.state.event_name.clone();
        let payload = submission_payload(&self.state.field, submission);
        runtime.spawn(async move {
            match client.publish(&event, &payload).await {
                Ok(ack) => {
                    tracing::info!(event = %event, status = ack.status, "Publish accepted");
                    let _ = tx.send(ViewIntent::PublishSucceeded);
                }
                Err(e) => {
                    tracing::warn!(event = %event, error = %e, "Publish failed");
                    let _ = tx.send(ViewIntent::PublishFailed(e.to_string()));
                }
            }
        });
    }

    /// Remove this binding's registrations from `channel`.
    pub fn unbind(self, channel: &Channel) {
        for id in self.listeners {
            channel.remove_listener(id);
        }
    }
}

fn submission_payload(field: &str, input: String) -> Value {
    let mut payload = json!({});
    payload[field] = Value::String(input);
    payload
}
