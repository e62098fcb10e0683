//! Connection driver: keeps one event-stream request alive, reconnecting
//! with backoff, and feeds decoded frames to the channel core.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::sync::watch;

use super::dispatch::ChannelCore;
use super::error::ChannelError;
use super::{ConnectionStatus, SubscriptionConfig};
use crate::sse::SseDecoder;

const LAST_EVENT_ID: &str = "Last-Event-ID";

/// Exponential reconnect delay, capped.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            attempt: 0,
        }
    }

    /// Next delay. A server-requested `retry:` replaces the base delay.
    pub(crate) fn next_delay(&mut self, server_retry: Option<Duration>) -> Duration {
        let base = server_retry.unwrap_or(self.initial);
        let factor = 1u32.checked_shl(self.attempt.min(16)).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        base.saturating_mul(factor).min(self.max.max(base))
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}

enum Attempt {
    /// The server answered 204: do not reconnect.
    Stop,
    /// The stream opened and later ended.
    Dropped,
    /// The attempt failed before the stream opened.
    Failed(ChannelError),
}

/// Resume state carried across reconnects.
#[derive(Default)]
struct Resume {
    last_event_id: Option<String>,
    server_retry: Option<Duration>,
}

pub(crate) async fn run(
    core: Arc<ChannelCore>,
    config: SubscriptionConfig,
    status: Arc<watch::Sender<ConnectionStatus>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let client = match Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            let error = ChannelError::Client(e);
            tracing::error!(error = %error, "Event stream client unavailable");
            core.report_error(&error);
            status.send_replace(ConnectionStatus::Closed);
            return;
        }
    };

    let mut backoff = Backoff::new(config.reconnect_initial, config.reconnect_max);
    let mut resume = Resume::default();
    let mut first = true;

    loop {
        status.send_replace(if first {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Reconnecting
        });
        first = false;

        let attempt = tokio::select! {
            attempt = stream_once(&client, &config, &core, &status, &mut resume, &mut backoff) => attempt,
            _ = shutdown.changed() => break,
        };

        match attempt {
            Attempt::Stop => {
                tracing::info!(url = %config.url, "Event stream answered 204; not reconnecting");
                break;
            }
            Attempt::Dropped => {
                tracing::info!(url = %config.url, "Event stream dropped");
            }
            Attempt::Failed(error) => {
                tracing::warn!(url = %config.url, error = %error, "Event stream attempt failed");
                core.report_error(&error);
            }
        }

        if core.is_closed() || *shutdown.borrow() {
            break;
        }

        let delay = backoff.next_delay(resume.server_retry);
        status.send_replace(ConnectionStatus::Reconnecting);
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    status.send_replace(ConnectionStatus::Closed);
}

async fn stream_once(
    client: &Client,
    config: &SubscriptionConfig,
    core: &ChannelCore,
    status: &watch::Sender<ConnectionStatus>,
    resume: &mut Resume,
    backoff: &mut Backoff,
) -> Attempt {
    let mut request = client
        .get(&config.url)
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache");
    if let Some(id) = &resume.last_event_id {
        request = request.header(LAST_EVENT_ID, id);
    }
    if config.with_credentials {
        if let Some(credential) = &config.credential {
            request = request.header(AUTHORIZATION, credential.bearer_header());
        }
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(source) => {
            return Attempt::Failed(ChannelError::Connect {
                url: config.url.clone(),
                source,
            })
        }
    };

    let code = response.status();
    if code == StatusCode::NO_CONTENT {
        return Attempt::Stop;
    }
    if !code.is_success() {
        return Attempt::Failed(ChannelError::Status {
            status: code.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("text/event-stream") {
        return Attempt::Failed(ChannelError::ContentType {
            found: content_type,
        });
    }

    status.send_replace(ConnectionStatus::Open);
    backoff.reset();
    tracing::info!(url = %config.url, "Event stream open");

    let mut decoder = SseDecoder::with_last_event_id(resume.last_event_id.clone());
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for frame in decoder.feed(&bytes) {
                    core.process_frame(&frame);
                }
                resume.last_event_id = decoder.last_event_id().map(str::to_string);
                if decoder.retry().is_some() {
                    resume.server_retry = decoder.retry();
                }
                if core.is_closed() {
                    break;
                }
            }
            Err(e) => {
                let error = ChannelError::Stream(e);
                tracing::warn!(error = %error, "Event stream read failed");
                core.report_error(&error);
                break;
            }
        }
    }

    decoder.finish();
    Attempt::Dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(None), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(None), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(None), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(None), Duration::from_millis(350));
    }

    #[test]
    fn backoff_reset_starts_over() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
        backoff.next_delay(None);
        backoff.next_delay(None);
        backoff.reset();
        assert_eq!(backoff.next_delay(None), Duration::from_millis(100));
    }

    #[test]
    fn server_retry_replaces_base_delay() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
        assert_eq!(
            backoff.next_delay(Some(Duration::from_millis(40))),
            Duration::from_millis(40)
        );
        assert_eq!(
            backoff.next_delay(Some(Duration::from_millis(40))),
            Duration::from_millis(80)
        );
    }

    #[test]
    fn server_retry_above_cap_is_honoured() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(200));
        assert_eq!(
            backoff.next_delay(Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
    }
}
