//! Batching queue that delivers telemetry records to a sink.

pub mod batch;
pub mod config;
pub mod sink;

pub use batch::*;
pub use config::*;
pub use sink::*;
