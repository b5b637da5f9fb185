//! Defaults and bounds for the telemetry pipeline.
//!
//! Periods are in milliseconds so they can be set from plain config values.

// === Queue ===

/// Records buffered before a size-triggered flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Period of the time-triggered flush (30 seconds).
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 30_000;

/// Upper bound on one sink call before it counts as failed.
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 10_000;

/// Buffered records kept under sustained sink failure.
///
/// Beyond this the oldest records are dropped.
pub const DEFAULT_MAX_BUFFERED: usize = 10_000;

// === Health ===

/// Period of the health check tick (5 minutes).
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 300_000;

/// Upper bound on one probe before it reports unhealthy.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;

// === Metrics sampling ===

/// Period of the system metrics sample (1 minute).
pub const DEFAULT_COLLECT_INTERVAL_MS: u64 = 60_000;

/// Battery level reported when the platform gives no reading.
pub const DEFAULT_BATTERY_LEVEL: f64 = 100.0;

// === Sink ===

/// HTTP timeout for the ingest endpoint.
pub const DEFAULT_SINK_TIMEOUT_MS: u64 = 10_000;

/// Error bodies longer than this are truncated before logging.
pub const MAX_ERROR_BODY_LEN: usize = 512;
