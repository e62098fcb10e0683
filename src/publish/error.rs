//! Error types for the publish client.

use std::fmt;

use thiserror::Error;

use crate::codec::EncodeError;

/// What went wrong below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportReason {
    /// Could not reach the endpoint.
    Connect,
    /// The caller's timeout expired.
    Timeout,
    /// The connection failed while reading the response.
    Body,
    /// Any other request failure.
    Request,
}

impl fmt::Display for TransportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransportReason::Connect => "connection failed",
            TransportReason::Timeout => "timed out",
            TransportReason::Body => "failed reading response",
            TransportReason::Request => "request failed",
        };
        f.write_str(text)
    }
}

/// Errors that can occur during a publish call.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The payload could not be encoded; nothing was sent.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network unreachable, connection dropped, or timeout.
    #[error("Transport error publishing to '{url}': {reason}")]
    Transport {
        url: String,
        reason: TransportReason,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The endpoint answered with a non-success status.
    #[error("Publish rejected with status {status}")]
    Rejected { status: u16, body: String },
}

impl PublishError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PublishError::Transport {
                reason: TransportReason::Timeout,
                ..
            }
        )
    }

    /// Status code for rejected publishes.
    pub fn status(&self) -> Option<u16> {
        match self {
            PublishError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short error type string for logs and the UI status line.
    pub fn error_type(&self) -> &'static str {
        match self {
            PublishError::Encode(_) => "encode_error",
            PublishError::Client(_) => "client_error",
            PublishError::Transport { .. } => "transport_error",
            PublishError::Rejected { .. } => "rejected",
        }
    }
}
