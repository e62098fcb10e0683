use thiserror::Error;

use crate::codec::DecodeError;

/// Non-fatal problems observed by a subscription channel.
///
/// These never tear the channel down; they are logged and handed to error
/// observers registered with `Channel::on_error`.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A message could not be decoded and was dropped.
    #[error("Dropped '{event}' message: {source}")]
    Decode {
        event: String,
        #[source]
        source: DecodeError,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connecting to the event stream failed.
    #[error("Connection to '{url}' failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The event stream answered with a non-success status.
    #[error("Event stream returned status {status}")]
    Status { status: u16 },

    /// The response was not an event stream.
    #[error("Expected text/event-stream, got '{found}'")]
    ContentType { found: String },

    /// The connection dropped mid-stream.
    #[error("Event stream interrupted: {0}")]
    Stream(#[source] reqwest::Error),
}

impl ChannelError {
    pub fn is_decode(&self) -> bool {
        matches!(self, ChannelError::Decode { .. })
    }
}
