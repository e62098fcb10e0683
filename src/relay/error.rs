//! Error types for the relay server.
//!
//! `RelayError` covers startup and serving; `ApiError` is what a request
//! handler answers with, rendered as a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::codec::DecodeError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid bind address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("Could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid allowed origin '{0}'")]
    InvalidOrigin(String),

    #[error("Relay server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Errors answered to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(#[from] DecodeError),

    #[error("Event name '{0}' is reserved")]
    ReservedEvent(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidEnvelope(_) | ApiError::ReservedEvent(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidEnvelope(_) => "invalid_envelope",
            ApiError::ReservedEvent(_) => "reserved_event",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        });
        (self.status_code(), axum::Json(body)).into_response()
    }
}
