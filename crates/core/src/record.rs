//! Telemetry record definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Well-known record kinds.
pub mod kinds {
    pub const EVENT: &str = "event";
    pub const SCREEN_LOAD: &str = "screen_load";
    pub const API_LATENCY: &str = "api_latency";
    pub const SYSTEM: &str = "system";
}

/// One unit of telemetry: an event or a metric sample.
///
/// Immutable once captured. The capture timestamp is taken at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: Uuid,
    kind: String,
    payload: Map<String, Value>,
    captured_at: DateTime<Utc>,
}

impl Record {
    /// Capture a record now.
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self::captured_at(kind, payload, Utc::now())
    }

    /// Capture a record with an explicit timestamp.
    pub fn captured_at(
        kind: impl Into<String>,
        payload: Map<String, Value>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            payload,
            captured_at,
        }
    }

    /// Build a record from any serializable value that encodes to a JSON object.
    ///
    /// Non-object values are stored under a `value` key.
    pub fn from_serializable<T: Serialize>(kind: impl Into<String>, data: &T) -> crate::Result<Self> {
        let payload = match serde_json::to_value(data)? {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Ok(Self::new(kind, payload))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn captured_at_time(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
