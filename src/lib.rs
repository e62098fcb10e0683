//! namecast: publish named JSON events over HTTP and follow them live over
//! server-sent events.
//!
//! - [`codec`]: the `{"event", "data"}` envelope
//! - [`publish`]: HTTP POST client
//! - [`channel`]: reconnecting event-stream subscription with per-name state
//! - [`view`]: form and display bound to one event name
//! - [`relay`]: reference server joining the two endpoints

pub mod channel;
pub mod codec;
pub mod config;
pub mod logging;
pub mod publish;
pub mod relay;
pub mod sse;
pub mod view;
