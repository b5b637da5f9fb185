//! Performance metrics collection.

use parking_lot::RwLock;
use pipeline_core::limits::DEFAULT_COLLECT_INTERVAL_MS;
use pipeline_core::record::kinds;
use pipeline_core::{Record, Result, Scheduler};
use queue::BatchQueue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use validator::Validate;

use crate::sampler::{ProcessSampler, Sampler};

/// Collector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CollectorConfig {
    /// Period of the system sampling tick in milliseconds
    #[serde(default = "default_interval_ms")]
    #[validate(range(min = 1))]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_COLLECT_INTERVAL_MS
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl CollectorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Latest observed value of each performance metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub screen_load_time_ms: f64,
    pub api_latency_ms: f64,
    pub memory_usage_mb: f64,
    pub battery_level: f64,
}

/// Records performance measurements and forwards each one to the queue.
pub struct MetricsCollector {
    config: CollectorConfig,
    queue: Arc<BatchQueue>,
    sampler: Arc<dyn Sampler>,
    current: RwLock<PerformanceMetrics>,
}

impl MetricsCollector {
    pub fn new(
        config: CollectorConfig,
        queue: Arc<BatchQueue>,
        sampler: Arc<dyn Sampler>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            queue,
            sampler,
            current: RwLock::new(PerformanceMetrics::default()),
        })
    }

    /// Collector backed by [`ProcessSampler`].
    pub fn with_process_sampler(config: CollectorConfig, queue: Arc<BatchQueue>) -> Result<Self> {
        Self::new(config, queue, Arc::new(ProcessSampler))
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Register periodic system sampling with the scheduler.
    pub fn start(self: &Arc<Self>, scheduler: &Scheduler) {
        let collector = Arc::clone(self);
        scheduler.every("metrics-collect", self.config.interval(), move || {
            let collector = collector.clone();
            async move {
                collector.collect_system_metrics().await;
            }
        });
    }

    pub fn current(&self) -> PerformanceMetrics {
        *self.current.read()
    }

    pub async fn record_screen_load(&self, screen: &str, load_time_ms: f64) {
        self.current.write().screen_load_time_ms = load_time_ms;

        let mut payload = Map::new();
        payload.insert("screen".into(), Value::String(screen.to_string()));
        payload.insert("load_time_ms".into(), json!(load_time_ms));
        self.queue.enqueue(Record::new(kinds::SCREEN_LOAD, payload)).await;
    }

    pub async fn record_api_call(&self, endpoint: &str, latency_ms: f64) {
        self.current.write().api_latency_ms = latency_ms;

        let mut payload = Map::new();
        payload.insert("endpoint".into(), Value::String(endpoint.to_string()));
        payload.insert("latency_ms".into(), json!(latency_ms));
        self.queue.enqueue(Record::new(kinds::API_LATENCY, payload)).await;
    }

    /// Take one system sample. A failed sample skips the tick.
    pub async fn collect_system_metrics(&self) {
        let sample = match self.sampler.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(code = e.code(), error = %e, "System sample failed");
                return;
            }
        };

        {
            let mut current = self.current.write();
            current.memory_usage_mb = sample.memory_usage_mb;
            current.battery_level = sample.battery_level;
        }
        debug!(
            memory_usage_mb = sample.memory_usage_mb,
            battery_level = sample.battery_level,
            "System sample taken"
        );

        match Record::from_serializable(kinds::SYSTEM, &sample) {
            Ok(record) => self.queue.enqueue(record).await,
            Err(e) => warn!(code = e.code(), error = %e, "Failed to encode system sample"),
        }
    }
}
