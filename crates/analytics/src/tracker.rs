//! Application event tracking.

use pipeline_core::record::kinds;
use pipeline_core::Record;
use queue::BatchQueue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A named application event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl AnalyticsEvent {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn into_record(self) -> Record {
        let mut payload = Map::new();
        payload.insert("event_name".into(), Value::String(self.event_name));
        if let Some(user_id) = self.user_id {
            payload.insert("user_id".into(), Value::String(user_id));
        }
        payload.insert("properties".into(), Value::Object(self.properties));
        Record::new(kinds::EVENT, payload)
    }
}

/// Front door for application events.
#[derive(Clone)]
pub struct EventTracker {
    queue: Arc<BatchQueue>,
}

impl EventTracker {
    pub fn new(queue: Arc<BatchQueue>) -> Self {
        Self { queue }
    }

    /// Stamp the event with the current time and queue it.
    pub async fn track_event(&self, event: AnalyticsEvent) {
        self.queue.enqueue(event.into_record()).await;
    }
}
