//! SSE (Server-Sent Events) parser.
//!
//! Incremental decoder for `text/event-stream` bodies. Bytes arrive in
//! arbitrary chunks; complete frames come out once their terminating blank
//! line has been seen. Handles format variations (e.g. `data:{...}` vs
//! `data: {...}`, `\r\n` and bare `\r` line endings).

use std::fmt::Write as _;
use std::time::Duration;

/// Event name used when a frame carries no `event:` field.
pub const DEFAULT_EVENT: &str = "message";

/// A dispatched SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name (`message` when the frame had no `event:` line).
    pub event: String,
    /// All `data:` lines joined with `\n`.
    pub data: String,
    /// Last event id in effect when the frame was dispatched.
    pub id: Option<String>,
}

impl SseFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Render this frame in wire format, terminated by a blank line.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if self.event != DEFAULT_EVENT {
            let _ = writeln!(out, "event: {}", self.event);
        }
        if let Some(id) = &self.id {
            let _ = writeln!(out, "id: {}", id);
        }
        for line in self.data.split('\n') {
            let _ = writeln!(out, "data: {}", line);
        }
        out.push('\n');
        out
    }
}

/// Stateful decoder fed with raw body chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    started: bool,
    /// Previous chunk ended on `\r`; a leading `\n` belongs to it.
    pending_cr: bool,
    event: Option<String>,
    data: Vec<String>,
    /// Id seen in the frame being read; committed on dispatch.
    id_buffer: Option<String>,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the last event id, e.g. when resuming after a reconnect.
    pub fn with_last_event_id(last_event_id: Option<String>) -> Self {
        Self {
            id_buffer: last_event_id.clone(),
            last_event_id,
            ..Self::default()
        }
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Most recent reconnection delay requested via `retry:`.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Feed a chunk of bytes and return every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut i = 0;

        if self.pending_cr {
            self.pending_cr = false;
            if chunk.first() == Some(&b'\n') {
                i = 1;
            }
        }

        while i < chunk.len() {
            match chunk[i] {
                b'\n' => self.end_line(&mut frames),
                b'\r' => {
                    self.end_line(&mut frames);
                    match chunk.get(i + 1) {
                        Some(b'\n') => i += 1,
                        Some(_) => {}
                        None => self.pending_cr = true,
                    }
                }
                b => self.line.push(b),
            }
            i += 1;
        }

        frames
    }

    /// Signal end of stream. An incomplete trailing frame is discarded.
    pub fn finish(&mut self) {
        self.line.clear();
        self.pending_cr = false;
        self.event = None;
        self.data.clear();
        self.id_buffer = self.last_event_id.clone();
    }

    fn end_line(&mut self, frames: &mut Vec<SseFrame>) {
        let raw = std::mem::take(&mut self.line);
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        if !self.started {
            self.started = true;
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string();
            }
        }

        if line.is_empty() {
            if let Some(frame) = self.dispatch() {
                frames.push(frame);
            }
            return;
        }

        // Comment / keep-alive
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => {
                if !value.contains('\0') {
                    self.id_buffer = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        self.last_event_id = self.id_buffer.clone();
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_event_id.clone(),
        })
    }
}
