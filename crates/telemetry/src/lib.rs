//! Internal observability for the telemetry pipeline.
//!
//! Structured logging setup plus in-process counters describing how the
//! queue and the health aggregator are behaving.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
