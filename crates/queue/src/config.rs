//! Queue and sink configuration.

use pipeline_core::limits::{
    DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_FLUSH_TIMEOUT_MS, DEFAULT_MAX_BUFFERED,
    DEFAULT_SINK_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Batching queue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_buffer_bound"))]
pub struct QueueConfig {
    /// Buffered records that trigger an immediate flush
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,
    /// Period of the timer-triggered flush in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    #[validate(range(min = 1))]
    pub flush_interval_ms: u64,
    /// Upper bound on one sink call in milliseconds
    #[serde(default = "default_flush_timeout_ms")]
    #[validate(range(min = 1))]
    pub flush_timeout_ms: u64,
    /// Oldest records beyond this are dropped; `None` keeps everything
    #[serde(default = "default_max_buffered")]
    pub max_buffered: Option<usize>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

fn default_flush_timeout_ms() -> u64 {
    DEFAULT_FLUSH_TIMEOUT_MS
}

fn default_max_buffered() -> Option<usize> {
    Some(DEFAULT_MAX_BUFFERED)
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
            max_buffered: default_max_buffered(),
        }
    }
}

impl QueueConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_buffered(mut self, max_buffered: Option<usize>) -> Self {
        self.max_buffered = max_buffered;
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

}

/// Cross-field: the buffer must hold at least one full batch.
fn validate_buffer_bound(config: &QueueConfig) -> Result<(), ValidationError> {
    match config.max_buffered {
        Some(max) if max < config.batch_size => {
            let mut err = ValidationError::new("max_buffered_below_batch_size");
            err.message = Some(Cow::Owned(format!(
                "max_buffered ({}) must not be below batch_size ({})",
                max, config.batch_size
            )));
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Remote ingest endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Endpoint accepting a JSON array of records
    #[serde(default = "default_sink_url")]
    #[validate(url)]
    pub url: String,
    /// Bearer token sent with every batch
    #[serde(default)]
    pub api_key: Option<String>,
    /// HTTP request timeout in milliseconds
    #[serde(default = "default_sink_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

fn default_sink_url() -> String {
    "http://localhost:8080/v1/ingest".to_string()
}

fn default_sink_timeout_ms() -> u64 {
    DEFAULT_SINK_TIMEOUT_MS
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: default_sink_url(),
            api_key: None,
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl SinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
