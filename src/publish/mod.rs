//! Publish client: a one-shot envelope write to the publish endpoint.

mod client;
mod error;

pub use client::{Ack, PublishClient, PublishConfig};
pub use error::{PublishError, TransportReason};
