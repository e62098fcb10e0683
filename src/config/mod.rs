//! Configuration: endpoint addresses and tunables.
//!
//! Loaded once at process start (TOML file plus environment overrides) and
//! passed into constructors; never mutated afterwards.

mod credentials;
mod loader;
mod types;

pub use credentials::SecureString;
pub use loader::{ConfigError, ENV_API_URL, ENV_CREDENTIAL, ENV_EVENTS_URL};
pub use types::{
    Config, EndpointsConfig, PublishSettings, RelayConfig, SubscriptionSettings, ViewConfig,
};
