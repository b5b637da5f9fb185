//! Dependency health checks.
//!
//! Probes run concurrently on every tick; the aggregator keeps the latest
//! result per dependency.

pub mod aggregator;
pub mod config;
pub mod probe;

pub use aggregator::*;
pub use config::*;
pub use probe::*;
