mod common;

use namecast::channel::ConnectionStatus;
use namecast::view::mvi::Reducer;
use namecast::view::{PublishStatus, ViewIntent, ViewReducer, ViewState};
use serde_json::json;

fn typed(text: &str) -> ViewState {
    text.chars().fold(ViewState::new("user", "user"), |state, c| {
        ViewReducer::reduce(state, ViewIntent::Input(c))
    })
}

#[test]
fn submit_keeps_input_and_queues_submission() {
    let state = ViewReducer::reduce(typed("Jane"), ViewIntent::Submit);
    assert_eq!(state.input, "Jane");
    assert_eq!(state.pending_submission.as_deref(), Some("Jane"));
    assert_eq!(state.displayed, None);
}

#[test]
fn submission_is_trimmed() {
    let state = ViewReducer::reduce(typed("  Jane "), ViewIntent::Submit);
    assert_eq!(state.pending_submission.as_deref(), Some("Jane"));
}

#[test]
fn second_submit_waits_for_first_to_be_taken() {
    let state = ViewReducer::reduce(typed("Jane"), ViewIntent::Submit);
    let state = ViewReducer::reduce(state, ViewIntent::Input('t'));
    let mut state = ViewReducer::reduce(state, ViewIntent::Submit);
    assert_eq!(state.take_submission().as_deref(), Some("Jane"));
}

#[test]
fn broadcast_with_non_string_field_shows_json() {
    let state = ViewReducer::reduce(
        ViewState::new("user", "user"),
        ViewIntent::Broadcast {
            value: json!({"user": {"first": "Jane"}}),
            sequence: 1,
        },
    );
    assert_eq!(state.displayed.as_deref(), Some(r#"{"first":"Jane"}"#));
}

#[test]
fn broadcast_uses_configured_field() {
    let state = ViewReducer::reduce(
        ViewState::new("greeting", "name"),
        ViewIntent::Broadcast {
            value: json!({"name": "Jane", "user": "ignored"}),
            sequence: 4,
        },
    );
    assert_eq!(state.displayed.as_deref(), Some("Jane"));
}

#[test]
fn connection_changes_are_tracked() {
    let state = ViewReducer::reduce(
        ViewState::default(),
        ViewIntent::Connection(ConnectionStatus::Reconnecting),
    );
    assert_eq!(state.connection, ConnectionStatus::Reconnecting);
}

#[test]
fn failure_then_new_submit_goes_back_to_sending() {
    let state = ViewReducer::reduce(
        typed("Jane"),
        ViewIntent::PublishFailed("timeout".to_string()),
    );
    let state = ViewReducer::reduce(state, ViewIntent::Submit);
    assert_eq!(state.publish, PublishStatus::Sending);
}

#[test]
fn quit_sets_flag() {
    let state = ViewReducer::reduce(ViewState::default(), ViewIntent::Quit);
    assert!(state.quit);
}
