use serde::{Deserialize, Serialize};

use crate::config::credentials::SecureString;

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub subscription: SubscriptionSettings,
    #[serde(default)]
    pub publish: PublishSettings,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// The two externally supplied addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// SSE stream URL (e.g. "http://127.0.0.1:8787/events").
    #[serde(default = "default_events_url")]
    pub events_url: String,
    /// Publish URL receiving the JSON envelope via POST.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Optional credential sent as `Authorization: Bearer <value>`.
    #[serde(default)]
    pub credential: Option<SecureString>,
}

/// Subscription channel tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Send the configured credential on the stream request (default: false).
    #[serde(default)]
    pub with_credentials: bool,
    /// First reconnect delay in milliseconds (default: 1000).
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds (default: 30000).
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Connection timeout in seconds for each connect attempt (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    /// Event name that signals a from-scratch stream restart (default: "reset").
    #[serde(default = "default_reset_event")]
    pub reset_event: String,
}

/// Publish client tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Default per-call timeout in seconds (default: 10).
    #[serde(default = "default_publish_timeout")]
    pub timeout_seconds: u32,
    /// Connection timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    /// Value of the `Origin` header sent with each publish.
    #[serde(default)]
    pub origin: Option<String>,
}

/// Reference relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Bind address (host:port).
    #[serde(default = "default_relay_bind_addr")]
    pub bind_addr: String,
    /// Value for `Access-Control-Allow-Origin` (default: "*").
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    /// Per-subscriber broadcast buffer (default: 64).
    #[serde(default = "default_relay_buffer")]
    pub buffer: usize,
}

/// View binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Event name the form publishes to and the display observes.
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// Field of the payload holding the displayed value.
    #[serde(default = "default_field")]
    pub field: String,
}

fn default_events_url() -> String {
    "http://127.0.0.1:8787/events".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:8787/publish".to_string()
}

fn default_reconnect_initial_ms() -> u64 {
    1000
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_reset_event() -> String {
    "reset".to_string()
}

fn default_publish_timeout() -> u32 {
    10
}

fn default_relay_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

fn default_relay_buffer() -> usize {
    64
}

fn default_event_name() -> String {
    "user".to_string()
}

fn default_field() -> String {
    "user".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            events_url: default_events_url(),
            api_url: default_api_url(),
            credential: None,
        }
    }
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            with_credentials: false,
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            connect_timeout_seconds: default_connect_timeout(),
            reset_event: default_reset_event(),
        }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_publish_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            origin: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_relay_bind_addr(),
            allowed_origin: default_allowed_origin(),
            buffer: default_relay_buffer(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            event_name: default_event_name(),
            field: default_field(),
        }
    }
}
