use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_core::Stream;
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::codec::decode;
use crate::relay::error::ApiError;
use crate::relay::hub::{Hub, RelayMessage};
use crate::relay::shutdown::ShutdownManager;

const LAST_EVENT_ID: &str = "last-event-id";

#[derive(Clone)]
pub(crate) struct RelayState {
    pub(crate) hub: Arc<Hub>,
    pub(crate) allowed_origin: HeaderValue,
    /// Name of the frame telling subscribers to drop their state.
    pub(crate) reset_event: String,
    pub(crate) keep_alive: Duration,
    pub(crate) shutdown: Arc<ShutdownManager>,
}

pub(crate) fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/publish", post(publish).options(preflight))
        .route("/events", get(events))
        .route("/health", get(health))
        .with_state(state)
}

async fn publish(State(state): State<RelayState>, body: String) -> Response {
    let decoded = decode(&body)
        .map_err(ApiError::from)
        .and_then(|envelope| {
            if envelope.event().as_str() == state.reset_event {
                Err(ApiError::ReservedEvent(state.reset_event.clone()))
            } else {
                Ok(envelope)
            }
        });
    let mut response = match decoded {
        Ok(envelope) => {
            let (message, delivered) = state.hub.publish(&envelope);
            tracing::info!(event = %message.event, id = %message.id, delivered, "Published");
            Json(json!({
                "ok": true,
                "event": message.event,
                "id": message.id,
                "delivered": delivered,
            }))
            .into_response()
        }
        Err(error) => {
            tracing::warn!(error = %error, "Rejected publish");
            error.into_response()
        }
    };
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, state.allowed_origin);
    response
}

async fn preflight(State(state): State<RelayState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, state.allowed_origin),
            (
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, authorization"),
            ),
            (ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("600")),
        ],
    )
}

async fn events(State(state): State<RelayState>, headers: HeaderMap) -> impl IntoResponse {
    let last_event_id = headers.get(LAST_EVENT_ID).and_then(|v| v.to_str().ok());
    let reset = match last_event_id {
        Some(id) if !state.hub.is_current(id) => {
            tracing::info!(last_event_id = %id, "Subscriber resumed from a previous run; sending reset");
            Some(
                Event::default()
                    .event(state.reset_event.as_str())
                    .data("{}")
                    .id(state.hub.origin_id()),
            )
        }
        _ => None,
    };

    tracing::debug!(resumed = last_event_id.is_some(), "Subscriber connected");
    let shutdown = state.shutdown.clone();
    let stream = event_stream(reset, state.hub.subscribe())
        .take_until(async move { shutdown.stopped().await });
    (
        [(ACCESS_CONTROL_ALLOW_ORIGIN, state.allowed_origin)],
        Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive)),
    )
}

fn event_stream(
    reset: Option<Event>,
    rx: broadcast::Receiver<RelayMessage>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let live = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let event = Event::default()
                        .event(message.event)
                        .data(message.data)
                        .id(message.id);
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged; skipping missed messages");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    stream::iter(reset.map(Ok)).chain(live)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "namecast",
    }))
}
