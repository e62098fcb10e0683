//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_server;

use namecast::channel::SubscriptionConfig;
use namecast::publish::PublishConfig;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Write `content` to a config file in a fresh temp dir.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Subscription settings with fast reconnects for tests.
pub fn subscription(url: &str) -> SubscriptionConfig {
    SubscriptionConfig {
        url: url.to_string(),
        with_credentials: false,
        credential: None,
        reconnect_initial: Duration::from_millis(20),
        reconnect_max: Duration::from_millis(100),
        connect_timeout: Duration::from_secs(2),
        reset_event: "reset".to_string(),
    }
}

pub fn publish_config(url: &str) -> PublishConfig {
    PublishConfig {
        url: url.to_string(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        origin: None,
        credential: None,
    }
}
