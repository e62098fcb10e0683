use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;

use crate::codec;
use crate::config::{Config, SecureString};
use crate::publish::error::{PublishError, TransportReason};

/// Settings for a [`PublishClient`], derived from [`Config`].
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub origin: Option<String>,
    pub credential: Option<SecureString>,
}

impl From<&Config> for PublishConfig {
    fn from(config: &Config) -> Self {
        Self {
            url: config.endpoints.api_url.clone(),
            timeout: Duration::from_secs(config.publish.timeout_seconds as u64),
            connect_timeout: Duration::from_secs(config.publish.connect_timeout_seconds as u64),
            origin: config.publish.origin.clone(),
            credential: config.endpoints.credential.clone(),
        }
    }
}

/// Server acknowledgement of an accepted publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub status: u16,
    /// Parsed JSON body; `None` when empty, a JSON string for non-JSON text.
    pub body: Option<Value>,
}

/// One-shot writer for the publish endpoint.
///
/// Each call sends exactly one POST. Retrying is the caller's decision.
#[derive(Clone)]
pub struct PublishClient {
    client: Client,
    config: PublishConfig,
}

impl PublishClient {
    pub fn new(config: PublishConfig) -> Result<Self, PublishError> {
        // One call, one request: a redirect is reported, never re-sent.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(PublishError::Client)?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.url
    }

    /// Publish `payload` under `event_name` using the configured timeout.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        event_name: &str,
        payload: &T,
    ) -> Result<Ack, PublishError> {
        self.publish_with_timeout(event_name, payload, self.config.timeout)
            .await
    }

    /// Publish with an explicit timeout covering the whole exchange.
    pub async fn publish_with_timeout<T: Serialize + ?Sized>(
        &self,
        event_name: &str,
        payload: &T,
        limit: Duration,
    ) -> Result<Ack, PublishError> {
        let wire = codec::encode(event_name, payload)?;

        tracing::debug!(event = %event_name, url = %self.config.url, "Publishing envelope");

        match timeout(limit, self.send(wire)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    event = %event_name,
                    timeout_ms = limit.as_millis() as u64,
                    "Publish timed out"
                );
                Err(self.transport(TransportReason::Timeout, None))
            }
        }
    }

    async fn send(&self, wire: String) -> Result<Ack, PublishError> {
        let mut builder = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(origin) = &self.config.origin {
            builder = builder.header(ORIGIN, origin);
        }
        if let Some(credential) = &self.config.credential {
            builder = builder.header(AUTHORIZATION, credential.bearer_header());
        }

        let response = builder.body(wire).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                TransportReason::Timeout
            } else if e.is_connect() {
                TransportReason::Connect
            } else {
                TransportReason::Request
            };
            self.transport(reason, Some(e))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport(TransportReason::Body, Some(e)))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Publish rejected");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(Ack {
            status: status.as_u16(),
            body: parse_ack_body(&text),
        })
    }

    fn transport(&self, reason: TransportReason, source: Option<reqwest::Error>) -> PublishError {
        PublishError::Transport {
            url: self.config.url.clone(),
            reason,
            source,
        }
    }
}

fn parse_ack_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
