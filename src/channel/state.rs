//! Per-event-name state held by a channel.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Default, Clone)]
struct Slot {
    value: Option<Value>,
    sequence: u64,
}

/// Latest value and sequence counter for every event name seen.
///
/// Mutated only by the channel's dispatch timeline.
#[derive(Debug, Default)]
pub struct ChannelState {
    slots: HashMap<String, Slot>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored value for `event` and return its new sequence.
    pub fn apply(&mut self, event: &str, value: Value) -> u64 {
        let slot = self.slots.entry(event.to_string()).or_default();
        slot.value = Some(value);
        slot.sequence += 1;
        slot.sequence
    }

    pub fn latest(&self, event: &str) -> Option<Value> {
        self.slots.get(event).and_then(|slot| slot.value.clone())
    }

    /// Sequence counter for `event`; zero before the first value.
    pub fn sequence(&self, event: &str) -> u64 {
        self.slots.get(event).map_or(0, |slot| slot.sequence)
    }

    /// Forget every value and zero every counter.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    /// Event names currently holding a value.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn starts_without_value() {
        let state = ChannelState::new();
        assert_eq!(state.latest("user"), None);
        assert_eq!(state.sequence("user"), 0);
    }

    #[test]
    fn apply_replaces_value_and_counts() {
        let mut state = ChannelState::new();
        assert_eq!(state.apply("user", json!({"user": "Jane"})), 1);
        assert_eq!(state.apply("user", json!({"user": "Joe"})), 2);
        assert_eq!(state.latest("user"), Some(json!({"user": "Joe"})));
        assert_eq!(state.sequence("user"), 2);
        assert_eq!(state.sequence("other"), 0);
    }

    #[test]
    fn identical_values_still_advance_sequence() {
        let mut state = ChannelState::new();
        state.apply("user", json!(1));
        assert_eq!(state.apply("user", json!(1)), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = ChannelState::new();
        state.apply("a", json!(1));
        state.apply("b", json!(2));
        assert_eq!(state.event_names(), vec!["a".to_string(), "b".to_string()]);
        state.reset();
        assert_eq!(state.latest("a"), None);
        assert_eq!(state.sequence("b"), 0);
        assert!(state.event_names().is_empty());
    }
}
