//! Listener registrations, kept in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::error::ChannelError;

/// A change delivered to update listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub event: String,
    pub value: Value,
    pub sequence: u64,
}

/// Handle returned by every registration; pass to `remove_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type UpdateCallback = Arc<dyn Fn(&Update) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&ChannelError) + Send + Sync>;
pub type ResetCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    updates: HashMap<String, Vec<(ListenerId, UpdateCallback)>>,
    errors: Vec<(ListenerId, ErrorCallback)>,
    resets: Vec<(ListenerId, ResetCallback)>,
}

impl Registry {
    fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    pub(crate) fn add_update(&mut self, event: &str, callback: UpdateCallback) -> ListenerId {
        let id = self.allocate();
        self.updates
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    pub(crate) fn add_error(&mut self, callback: ErrorCallback) -> ListenerId {
        let id = self.allocate();
        self.errors.push((id, callback));
        id
    }

    pub(crate) fn add_reset(&mut self, callback: ResetCallback) -> ListenerId {
        let id = self.allocate();
        self.resets.push((id, callback));
        id
    }

    /// Returns true if a registration was removed.
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for listeners in self.updates.values_mut() {
            let before = listeners.len();
            listeners.retain(|(lid, _)| *lid != id);
            removed |= listeners.len() != before;
        }
        self.updates.retain(|_, listeners| !listeners.is_empty());

        let before = self.errors.len() + self.resets.len();
        self.errors.retain(|(lid, _)| *lid != id);
        self.resets.retain(|(lid, _)| *lid != id);
        removed || self.errors.len() + self.resets.len() != before
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.updates
            .values()
            .any(|listeners| listeners.iter().any(|(lid, _)| *lid == id))
            || self.errors.iter().any(|(lid, _)| *lid == id)
            || self.resets.iter().any(|(lid, _)| *lid == id)
    }

    pub(crate) fn updates_for(&self, event: &str) -> Vec<(ListenerId, UpdateCallback)> {
        self.updates.get(event).cloned().unwrap_or_default()
    }

    pub(crate) fn errors(&self) -> Vec<(ListenerId, ErrorCallback)> {
        self.errors.clone()
    }

    pub(crate) fn resets(&self) -> Vec<(ListenerId, ResetCallback)> {
        self.resets.clone()
    }

    pub(crate) fn clear(&mut self) {
        self.updates.clear();
        self.errors.clear();
        self.resets.clear();
    }

    pub(crate) fn observed_events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.updates.keys().cloned().collect();
        names.sort();
        names
    }
}
