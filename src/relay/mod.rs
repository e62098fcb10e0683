//! Reference relay server.
//!
//! `POST /publish` accepts an envelope and broadcasts it; `GET /events`
//! streams every broadcast as server-sent events. Subscribers that resume
//! with an id from an earlier run first receive a reset frame. The reset
//! event name itself cannot be published.

mod error;
mod hub;
mod routes;
mod shutdown;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tokio::net::TcpListener;

use crate::config::RelayConfig;

use self::hub::Hub;
use self::routes::{build_router, RelayState};
use self::shutdown::ShutdownManager;

pub use error::{ApiError, RelayError};
pub use hub::RelayMessage;
pub use shutdown::RelayHandle;

const KEEP_ALIVE: Duration = Duration::from_secs(15);
const DEFAULT_RESET_EVENT: &str = "reset";

pub struct Relay {
    addr: SocketAddr,
    /// Bound in `bind` so the port is held until `run`.
    listener: TcpListener,
    state: RelayState,
    shutdown: Arc<ShutdownManager>,
}

impl Relay {
    pub async fn bind(config: &RelayConfig) -> Result<Self, RelayError> {
        let addr: SocketAddr =
            config
                .bind_addr
                .parse()
                .map_err(|source| RelayError::InvalidAddress {
                    addr: config.bind_addr.clone(),
                    source,
                })?;
        let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
            .map_err(|_| RelayError::InvalidOrigin(config.allowed_origin.clone()))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(RelayError::Serve)?;
        let hub = Arc::new(Hub::new(config.buffer));
        let shutdown = Arc::new(ShutdownManager::new());
        tracing::info!(addr = %addr, epoch = %hub.epoch(), "Relay bound");

        Ok(Self {
            addr,
            listener,
            state: RelayState {
                hub,
                allowed_origin,
                reset_event: DEFAULT_RESET_EVENT.to_string(),
                keep_alive: KEEP_ALIVE,
                shutdown: shutdown.clone(),
            },
            shutdown,
        })
    }

    /// Name used for reset frames; publishing under it is refused.
    pub fn with_reset_event(mut self, name: impl Into<String>) -> Self {
        self.state.reset_event = name.into();
        self
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle::new(self.shutdown.clone())
    }

    /// Serve until the handle fires or the process receives SIGINT/SIGTERM.
    pub async fn run(self) -> Result<(), RelayError> {
        tracing::info!(addr = %self.addr, "Relay listening");
        let app = build_router(self.state);
        let shutdown = self.shutdown.clone();
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait_for_shutdown().await;
            })
            .into_future()
            .await
            .map_err(RelayError::Serve)?;
        tracing::info!("Relay stopped");
        Ok(())
    }
}
