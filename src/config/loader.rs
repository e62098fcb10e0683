use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use thiserror::Error;

use crate::config::credentials::SecureString;
use crate::config::types::Config;

/// Environment variable overriding `endpoints.events_url`.
pub const ENV_EVENTS_URL: &str = "NAMECAST_EVENTS_URL";
/// Environment variable overriding `endpoints.api_url`.
pub const ENV_API_URL: &str = "NAMECAST_API_URL";
/// Environment variable overriding `endpoints.credential`.
pub const ENV_CREDENTIAL: &str = "NAMECAST_CREDENTIAL";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/namecast/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("namecast").join("config.toml")
    }

    /// Loads configuration from the default path, then applies environment
    /// overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path(), |key| std::env::var(key).ok())
    }

    /// Loads configuration from `path` (defaults when the file is missing),
    /// applies overrides from `lookup`, and validates.
    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parses the TOML file at `path` without validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Replace endpoint settings with any values present in the environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_EVENTS_URL).filter(|v| !v.is_empty()) {
            self.endpoints.events_url = url;
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.endpoints.api_url = url;
        }
        if let Some(credential) = lookup(ENV_CREDENTIAL).filter(|v| !v.is_empty()) {
            self.endpoints.credential = Some(SecureString::new(credential));
        }
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Both endpoint URLs parse as http(s) URLs
    /// - The view event name and field are non-empty
    /// - Timeouts and reconnect delays are non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("endpoints.events_url", &self.endpoints.events_url)?;
        validate_url("endpoints.api_url", &self.endpoints.api_url)?;

        if self.view.event_name.is_empty() {
            return Err(invalid("view.event_name must not be empty"));
        }
        if self.view.field.is_empty() {
            return Err(invalid("view.field must not be empty"));
        }
        if self.subscription.reset_event.is_empty() {
            return Err(invalid("subscription.reset_event must not be empty"));
        }
        if self.subscription.reset_event == self.view.event_name {
            return Err(invalid(
                "subscription.reset_event must differ from view.event_name",
            ));
        }
        if self.publish.timeout_seconds == 0 {
            return Err(invalid("publish.timeout_seconds must be greater than zero"));
        }
        if self.publish.connect_timeout_seconds == 0 {
            return Err(invalid(
                "publish.connect_timeout_seconds must be greater than zero",
            ));
        }
        if self.subscription.connect_timeout_seconds == 0 {
            return Err(invalid(
                "subscription.connect_timeout_seconds must be greater than zero",
            ));
        }
        if self.subscription.reconnect_initial_ms == 0 {
            return Err(invalid(
                "subscription.reconnect_initial_ms must be greater than zero",
            ));
        }
        if self.subscription.reconnect_max_ms < self.subscription.reconnect_initial_ms {
            return Err(invalid(
                "subscription.reconnect_max_ms must not be below reconnect_initial_ms",
            ));
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| invalid(&format!("{} '{}' is not a valid URL: {}", field, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(&format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}
