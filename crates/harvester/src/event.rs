//! Feed events.
//!
//! Events are schema-free JSON objects. Only `id` is interpreted; every other field is carried
//! through unmodified, in upstream order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field injected into every persisted record.
pub const CAPTURED_AT_FIELD: &str = "_crawled_at";

/// One event object from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Identifier as an opaque string. Numeric ids are rendered in decimal so that `100` and
    /// `"100"` compare equal; any other shape counts as no id.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// True if this event's id equals `watermark` exactly.
    pub fn is(&self, watermark: &str) -> bool {
        self.id().as_deref() == Some(watermark)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copy of the record with [CAPTURED_AT_FIELD] set to `captured_at` (RFC 3339).
    pub fn stamped(&self, captured_at: DateTime<Utc>) -> Map<String, Value> {
        let mut fields = self.0.clone();
        fields.insert(
            CAPTURED_AT_FIELD.to_string(),
            Value::String(captured_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        fields
    }
}
