use serde_json::Value;

use crate::channel::ConnectionStatus;
use crate::view::mvi::{Intent, Reducer, UiState};

/// Outcome of the most recent submit, shown on the status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublishStatus {
    #[default]
    Idle,
    Sending,
    Sent,
    Failed(String),
}

/// Everything needed to render the form and the live value.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub event_name: String,
    pub field: String,
    /// Value shown under the question; changes only on broadcast.
    pub displayed: Option<String>,
    /// Sequence of the broadcast currently displayed.
    pub sequence: u64,
    pub input: String,
    pub publish: PublishStatus,
    pub connection: ConnectionStatus,
    /// Submission waiting to be handed to the publish client.
    pub pending_submission: Option<String>,
    pub quit: bool,
}

impl ViewState {
    pub fn new(event_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            field: field.into(),
            displayed: None,
            sequence: 0,
            input: String::new(),
            publish: PublishStatus::Idle,
            connection: ConnectionStatus::Connecting,
            pending_submission: None,
            quit: false,
        }
    }

    /// Take the submission produced by the last `Submit`, if any.
    pub fn take_submission(&mut self) -> Option<String> {
        self.pending_submission.take()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new("user", "user")
    }
}

impl UiState for ViewState {}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewIntent {
    Input(char),
    Backspace,
    Submit,
    Broadcast { value: Value, sequence: u64 },
    Reset,
    Connection(ConnectionStatus),
    PublishSucceeded,
    PublishFailed(String),
    Quit,
}

impl Intent for ViewIntent {}

/// Text shown for a payload: `data[field]` as plain text for strings,
/// compact JSON otherwise, nothing for null or a missing field.
pub fn display_value(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub struct ViewReducer;

impl Reducer for ViewReducer {
    type State = ViewState;
    type Intent = ViewIntent;

    fn reduce(mut state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            ViewIntent::Input(c) => {
                if !c.is_control() {
                    state.input.push(c);
                }
            }
            ViewIntent::Backspace => {
                state.input.pop();
            }
            ViewIntent::Submit => {
                let submission = state.input.trim();
                let idle = state.pending_submission.is_none()
                    && state.publish != PublishStatus::Sending;
                if !submission.is_empty() && idle {
                    // No optimistic update: `displayed` waits for the broadcast.
                    state.pending_submission = Some(submission.to_string());
                    state.publish = PublishStatus::Sending;
                }
            }
            // Already shown, e.g. queued before the binding seeded itself.
            ViewIntent::Broadcast { sequence, .. } if sequence <= state.sequence => {}
            ViewIntent::Broadcast { value, sequence } => {
                state.displayed = display_value(&value, &state.field);
                state.sequence = sequence;
            }
            ViewIntent::Reset => {
                state.displayed = None;
                state.sequence = 0;
            }
            ViewIntent::Connection(status) => state.connection = status,
            ViewIntent::PublishSucceeded => state.publish = PublishStatus::Sent,
            ViewIntent::PublishFailed(message) => state.publish = PublishStatus::Failed(message),
            ViewIntent::Quit => state.quit = true,
        }
        state
    }
}
