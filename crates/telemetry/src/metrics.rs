//! Internal pipeline metrics.
//!
//! Counters are process-wide and lock-free. A [`MetricsSnapshot`] can be
//! serialized and shipped through the pipeline itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

const BUCKET_COUNT: usize = 10;

/// Upper bounds (ms) of the latency buckets. The last bucket is open-ended.
const LATENCY_BOUNDS_MS: [u64; BUCKET_COUNT - 1] = [5, 10, 50, 100, 250, 1_000, 5_000, 10_000, 30_000];

/// Latency histogram in milliseconds.
#[derive(Debug, Default)]
pub struct Histogram {
    buckets: [AtomicU64; BUCKET_COUNT],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = LATENCY_BOUNDS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(LATENCY_BOUNDS_MS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            count => self.sum() as f64 / count as f64,
        }
    }

    /// Bucket counts as `(upper_bound_ms, count)`; the open bucket reports `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        LATENCY_BOUNDS_MS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Metrics for the queue and the health aggregator.
#[derive(Debug, Default)]
pub struct Metrics {
    // Queue
    pub records_enqueued: Counter,
    pub records_dropped: Counter,
    pub flushes_skipped: Counter,
    pub batches_delivered: Counter,
    pub records_delivered: Counter,
    pub sink_failures: Counter,
    pub records_requeued: Counter,
    pub buffer_depth: Gauge,
    pub flush_latency_ms: Histogram,

    // Health
    pub probe_runs: Counter,
    pub probe_failures: Counter,
    pub probe_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            records_enqueued: self.records_enqueued.get(),
            records_dropped: self.records_dropped.get(),
            flushes_skipped: self.flushes_skipped.get(),
            batches_delivered: self.batches_delivered.get(),
            records_delivered: self.records_delivered.get(),
            sink_failures: self.sink_failures.get(),
            records_requeued: self.records_requeued.get(),
            buffer_depth: self.buffer_depth.get(),
            flush_latency_mean_ms: self.flush_latency_ms.mean(),
            flush_latency_max_ms: self.flush_latency_ms.max(),
            probe_runs: self.probe_runs.get(),
            probe_failures: self.probe_failures.get(),
            probe_latency_mean_ms: self.probe_latency_ms.mean(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub records_enqueued: u64,
    pub records_dropped: u64,
    pub flushes_skipped: u64,
    pub batches_delivered: u64,
    pub records_delivered: u64,
    pub sink_failures: u64,
    pub records_requeued: u64,
    pub buffer_depth: u64,
    pub flush_latency_mean_ms: f64,
    pub flush_latency_max_ms: u64,
    pub probe_runs: u64,
    pub probe_failures: u64,
    pub probe_latency_mean_ms: f64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
