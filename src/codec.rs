//! Envelope codec.
//!
//! An envelope is the named payload unit exchanged between publishers and
//! subscribers. On the wire it is a JSON object:
//!
//! ```text
//! {"event": "user", "data": {"user": "Jane"}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while encoding an envelope.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Event name must not be empty")]
    InvalidEventName,

    #[error("Payload for '{event}' is not representable as JSON: {source}")]
    Serialize {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors produced while decoding wire text.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Envelope must be a JSON object")]
    NotAnObject,

    #[error("Envelope is missing a string 'event' field")]
    MissingEvent,

    #[error("Envelope 'event' field is empty")]
    EmptyEvent,

    #[error("Envelope is missing the 'data' field")]
    MissingData,

    #[error("Envelope names event '{found}' but arrived tagged '{expected}'")]
    EventMismatch { expected: String, found: String },
}

/// A non-empty event name identifying a logical topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    /// Returns `None` for an empty name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EventName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EventName::new(raw).ok_or_else(|| serde::de::Error::custom("event name must not be empty"))
    }
}

/// Named payload. The event name is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    event: EventName,
    pub data: Value,
}

impl Envelope {
    pub fn new(event: EventName, data: Value) -> Self {
        Self { event, data }
    }

    pub fn event(&self) -> &EventName {
        &self.event
    }

    pub fn into_parts(self) -> (EventName, Value) {
        (self.event, self.data)
    }

    /// Serialize to wire text.
    pub fn to_wire(&self) -> String {
        // Value trees built by serde_json always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Build an envelope from an event name and any serializable payload.
pub fn envelope<T: Serialize + ?Sized>(event_name: &str, data: &T) -> Result<Envelope, EncodeError> {
    let event = EventName::new(event_name).ok_or(EncodeError::InvalidEventName)?;
    let data = serde_json::to_value(data).map_err(|source| EncodeError::Serialize {
        event: event_name.to_string(),
        source,
    })?;
    Ok(Envelope::new(event, data))
}

/// Encode `data` under `event_name` as envelope wire text.
pub fn encode<T: Serialize + ?Sized>(event_name: &str, data: &T) -> Result<String, EncodeError> {
    envelope(event_name, data).map(|e| e.to_wire())
}

/// Decode envelope wire text.
pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    let Value::Object(object) = value else {
        return Err(DecodeError::NotAnObject);
    };
    envelope_from_object(object)
}

/// Decode an SSE payload that arrived tagged `tag`.
///
/// Accepts either a full envelope (whose event must match the tag) or a bare
/// JSON value, which is taken as the payload itself.
pub fn decode_payload(tag: &str, text: &str) -> Result<Value, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    match value {
        Value::Object(object) if object.contains_key("event") => {
            let envelope = envelope_from_object(object)?;
            if envelope.event().as_str() != tag {
                return Err(DecodeError::EventMismatch {
                    expected: tag.to_string(),
                    found: envelope.event().to_string(),
                });
            }
            Ok(envelope.data)
        }
        other => Ok(other),
    }
}

fn envelope_from_object(mut object: Map<String, Value>) -> Result<Envelope, DecodeError> {
    let event = match object.remove("event") {
        Some(Value::String(name)) => EventName::new(name).ok_or(DecodeError::EmptyEvent)?,
        _ => return Err(DecodeError::MissingEvent),
    };
    let data = object.remove("data").ok_or(DecodeError::MissingData)?;
    Ok(Envelope::new(event, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn round_trips_object_payload() {
        let wire = encode("user", &json!({"user": "Jane"})).unwrap();
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded.event().as_str(), "user");
        assert_eq!(decoded.data, json!({"user": "Jane"}));
    }

    #[test]
    fn round_trips_scalar_and_null_payloads() {
        for data in [json!(null), json!(42), json!("text"), json!([1, {"a": []}])] {
            let wire = encode("topic", &data).unwrap();
            let decoded = decode(&wire).unwrap();
            assert_eq!(decoded, Envelope::new(EventName::new("topic").unwrap(), data));
        }
    }

    #[test]
    fn encode_matches_published_wire_shape() {
        let wire = encode("user", &json!({"user": "Jane"})).unwrap();
        assert_eq!(wire, r#"{"event":"user","data":{"user":"Jane"}}"#);
    }

    #[test]
    fn encode_rejects_empty_event_name() {
        let err = encode("", &json!({})).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidEventName));
    }

    #[test]
    fn encode_rejects_non_string_map_keys() {
        let mut data = BTreeMap::new();
        data.insert(vec![1u8, 2], "bytes as key");
        let err = encode("user", &data).unwrap_err();
        match err {
            EncodeError::Serialize { event, .. } => assert_eq!(event, "user"),
            other => panic!("Expected Serialize error, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(""), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_missing_or_bad_event() {
        assert!(matches!(decode(r#"{"data": 1}"#), Err(DecodeError::MissingEvent)));
        assert!(matches!(
            decode(r#"{"event": 7, "data": 1}"#),
            Err(DecodeError::MissingEvent)
        ));
        assert!(matches!(
            decode(r#"{"event": "", "data": 1}"#),
            Err(DecodeError::EmptyEvent)
        ));
    }

    #[test]
    fn decode_rejects_missing_data_and_non_objects() {
        assert!(matches!(decode(r#"{"event": "user"}"#), Err(DecodeError::MissingData)));
        assert!(matches!(decode("[1, 2]"), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn decode_payload_unwraps_matching_envelope() {
        let data = decode_payload("user", r#"{"event":"user","data":{"user":"Jane"}}"#).unwrap();
        assert_eq!(data, json!({"user": "Jane"}));
    }

    #[test]
    fn decode_payload_accepts_bare_json() {
        let data = decode_payload("user", r#"{"user":"Jane"}"#).unwrap();
        assert_eq!(data, json!({"user": "Jane"}));
    }

    #[test]
    fn decode_payload_rejects_mismatched_envelope() {
        let err = decode_payload("user", r#"{"event":"other","data":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::EventMismatch { .. }));
    }

    #[test]
    fn decode_payload_rejects_non_json() {
        assert!(matches!(
            decode_payload("user", "Jane"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn event_name_deserialize_rejects_empty() {
        let parsed: Result<Envelope, _> = serde_json::from_str(r#"{"event":"","data":1}"#);
        assert!(parsed.is_err());
    }
}
