//! Wire and domain model: [`BaseEvent`], [`EnrichedEvent`], [`Context`], [`Batch`].

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::context::Context;

/// JSON-compatible recursive value tree for `properties`/`traits`.
///
/// Conversion from a host language's loose map happens at the public API
/// boundary, not inside this type — this crate only needs a typed
/// representation to carry values through the pipeline and serialize them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(HashMap<String, PropertyValue>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

pub type PropertyMap = HashMap<String, PropertyValue>;

/// The event type discriminant. Lowercased on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Track,
    Identify,
    Group,
    Screen,
    Page,
    Alias,
}

/// Producer-side input, before enrichment.
///
/// A tagged record rather than a class hierarchy: callers build one of
/// these and hand it to the ingest channel; everything downstream
/// switches on `event_type`.
#[derive(Debug, Clone)]
pub struct BaseEvent {
    pub event_type: EventType,
    pub event: Option<String>,
    pub properties: Option<PropertyMap>,
    pub traits: Option<PropertyMap>,
    pub timestamp: Option<String>,
}

impl BaseEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            event: None,
            properties: None,
            traits: None,
            timestamp: None,
        }
    }
}

/// The unit of queueing and transmission, produced by the enricher.
///
/// Once enqueued, every field is immutable except `sent_at`, which is
/// assigned exactly once per transmission attempt (and rewritten if the
/// event is requeued and retried).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<PropertyMap>,

    #[serde(rename = "anonymousId")]
    pub anonymous_id: String,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "groupId", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    pub timestamp: String,
    pub context: Context,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "writeKey")]
    pub write_key: String,
    #[serde(rename = "sentAt", skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
}

impl EnrichedEvent {
    /// Stamp `sent_at` for this transmission attempt. Called exactly once
    /// per batch, just before serialization.
    pub fn stamp_sent_at(&mut self, sent_at: &str) {
        self.sent_at = Some(sent_at.to_string());
    }
}

/// Format the current wall-clock time as `yyyy-MM-ddTHH:mm:ss.SSSZ`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate a `{epoch-ms}-{uuid-v4}` message id, unique across all
/// produced events (probabilistically, via UUID v4).
pub fn new_message_id() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4())
}

/// Ordered sequence of [`EnrichedEvent`]s for a single HTTP POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch: Vec<EnrichedEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_matches_expected_format() {
        let ts = now_iso();
        let re_ok = ts.len() == "2024-01-01T00:00:00.000Z".len()
            && ts.ends_with('Z')
            && ts.as_bytes()[4] == b'-'
            && ts.as_bytes()[10] == b'T';
        assert!(re_ok, "unexpected timestamp shape: {ts}");
    }

    #[test]
    fn message_ids_are_unique() {
        let mut ids = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(ids.insert(new_message_id()));
        }
    }

    #[test]
    fn event_type_serializes_lowercase() {
        let json = serde_json::to_string(&EventType::Track).unwrap();
        assert_eq!(json, "\"track\"");
    }
}
