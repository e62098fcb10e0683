//! Broadcast hub: stamps each published envelope with an id and fans it
//! out to every subscriber connected at that moment.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::codec::Envelope;

/// One message as sent to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayMessage {
    /// `<epoch>-<n>`.
    pub id: String,
    pub event: String,
    /// Envelope wire text.
    pub data: String,
}

pub struct Hub {
    epoch: String,
    next_id: AtomicU64,
    tx: broadcast::Sender<RelayMessage>,
}

impl Hub {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            epoch: Uuid::new_v4().simple().to_string(),
            next_id: AtomicU64::new(0),
            tx,
        }
    }

    /// Identifier of this relay run. Ids from another epoch mean the
    /// client's stream state predates a restart.
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Id a subscriber should resume from before anything is published.
    pub fn origin_id(&self) -> String {
        format!("{}-0", self.epoch)
    }

    /// True if `last_event_id` was issued by this relay run.
    pub fn is_current(&self, last_event_id: &str) -> bool {
        last_event_id
            .split_once('-')
            .is_some_and(|(epoch, _)| epoch == self.epoch)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayMessage> {
        self.tx.subscribe()
    }

    /// Broadcast `envelope`. Returns the message and the number of
    /// subscribers it reached.
    pub fn publish(&self, envelope: &Envelope) -> (RelayMessage, usize) {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let message = RelayMessage {
            id: format!("{}-{}", self.epoch, n),
            event: envelope.event().to_string(),
            data: envelope.to_wire(),
        };
        let delivered = self.tx.send(message.clone()).unwrap_or(0);
        tracing::debug!(event = %message.event, id = %message.id, delivered, "Broadcast");
        (message, delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::envelope;
    use serde_json::json;

    #[test]
    fn ids_are_sequential_within_epoch() {
        let hub = Hub::new(8);
        let env = envelope("user", &json!({"user": "Jane"})).unwrap();
        let (first, _) = hub.publish(&env);
        let (second, _) = hub.publish(&env);
        assert_eq!(first.id, format!("{}-1", hub.epoch()));
        assert_eq!(second.id, format!("{}-2", hub.epoch()));
        assert!(hub.is_current(&first.id));
        assert!(hub.is_current(&hub.origin_id()));
    }

    #[test]
    fn foreign_ids_are_not_current() {
        let hub = Hub::new(8);
        assert!(!hub.is_current("deadbeef-3"));
        assert!(!hub.is_current("7"));
        assert!(!hub.is_current(""));
    }

    #[test]
    fn delivers_to_connected_subscribers_only() {
        let hub = Hub::new(8);
        let env = envelope("user", &json!({"user": "Jane"})).unwrap();
        let (_, delivered) = hub.publish(&env);
        assert_eq!(delivered, 0);

        let mut rx = hub.subscribe();
        let (message, delivered) = hub.publish(&env);
        assert_eq!(delivered, 1);
        assert_eq!(rx.try_recv().unwrap(), message);
        assert_eq!(message.data, r#"{"event":"user","data":{"user":"Jane"}}"#);
    }
}
