//! Mock publish/subscribe server.
//!
//! `POST /publish` records the request and answers with the next queued
//! [`MockResponse`]; `GET /events` serves the next queued [`SseScript`].

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A captured publish request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A mock publish response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub delay_ms: u64,
    pub location: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::json(r#"{"ok": true}"#)
    }
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            body: body.as_bytes().to_vec(),
            delay_ms: 0,
            location: None,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: format!(r#"{{"error": "{}"}}"#, message).into_bytes(),
            delay_ms: 0,
            location: None,
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            body: Vec::new(),
            delay_ms: 0,
            location: Some(location.to_string()),
        }
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }
}

/// One scripted event-stream connection.
#[derive(Debug, Clone)]
pub struct SseScript {
    pub status: u16,
    pub content_type: String,
    /// Raw chunks written in order.
    pub chunks: Vec<String>,
    /// Keep the connection open after the last chunk.
    pub hold_open: bool,
}

impl SseScript {
    /// A stream that sends `frames` (`(event, data)` pairs) then closes.
    pub fn frames(frames: &[(&str, &str)]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream".to_string(),
            chunks: frames
                .iter()
                .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
                .collect(),
            hold_open: false,
        }
    }

    /// Raw wire chunks, sent as given.
    pub fn raw(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream".to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            hold_open: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            chunks: Vec::new(),
            hold_open: false,
        }
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    scripts: Arc<Mutex<VecDeque<SseScript>>>,
    /// `Last-Event-ID` of every event-stream connection, in order.
    connections: Arc<Mutex<Vec<Option<String>>>>,
    /// `Authorization` header of every event-stream connection, in order.
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
}

pub struct MockServer {
    pub addr: SocketAddr,
    state: MockState,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            connections: Arc::new(Mutex::new(Vec::new())),
            authorizations: Arc::new(Mutex::new(Vec::new())),
        };

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/publish", post(handle_publish))
            .route("/events", get(handle_events))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
        }
    }

    pub async fn enqueue_response(&self, resp: MockResponse) {
        self.state.responses.lock().await.push_back(resp);
    }

    pub async fn enqueue_stream(&self, script: SseScript) {
        self.state.scripts.lock().await.push_back(script);
    }

    pub async fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn connections(&self) -> Vec<Option<String>> {
        self.state.connections.lock().await.clone()
    }

    pub async fn authorizations(&self) -> Vec<Option<String>> {
        self.state.authorizations.lock().await.clone()
    }

    /// Wait until at least `n` event-stream connections have been made.
    pub async fn wait_for_connections(&self, n: usize, timeout: std::time::Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.state.connections.lock().await.len() >= n {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    pub fn publish_url(&self) -> String {
        format!("http://{}/publish", self.addr)
    }

    pub fn events_url(&self) -> String {
        format!("http://{}/events", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn handle_publish(State(state): State<MockState>, req: Request<Body>) -> Response<Body> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let body_bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .unwrap_or_default()
        .to_vec();

    state.requests.lock().await.push(CapturedRequest {
        method,
        path,
        headers,
        body: body_bytes,
    });

    let mock_resp = state
        .responses
        .lock()
        .await
        .pop_front()
        .unwrap_or_default();

    if mock_resp.delay_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(mock_resp.delay_ms)).await;
    }

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(mock_resp.status).unwrap())
        .header("content-type", "application/json");
    if let Some(location) = mock_resp.location {
        builder = builder.header("location", location);
    }
    builder.body(Body::from(mock_resp.body)).unwrap()
}

async fn handle_events(State(state): State<MockState>, headers: HeaderMap) -> Response<Body> {
    let last_event_id = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.authorizations.lock().await.push(authorization);
    state.connections.lock().await.push(last_event_id);

    // With nothing scripted, hold an empty stream open.
    let script = state
        .scripts
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| SseScript::raw(&[]).held_open());

    let chunks = stream::iter(
        script
            .chunks
            .into_iter()
            .map(Ok::<String, Infallible>)
            .collect::<Vec<_>>(),
    );
    let body: BoxStream<'static, Result<String, Infallible>> = if script.hold_open {
        chunks.chain(stream::pending()).boxed()
    } else {
        chunks.boxed()
    };

    Response::builder()
        .status(StatusCode::from_u16(script.status).unwrap())
        .header("content-type", script.content_type)
        .header("cache-control", "no-cache")
        .body(Body::from_stream(body))
        .unwrap()
}
