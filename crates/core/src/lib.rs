//! Core types, errors, and scheduling for the telemetry pipeline.

pub mod error;
pub mod health;
pub mod limits;
pub mod record;
pub mod scheduler;

pub use error::{Error, Result};
pub use health::*;
pub use record::*;
pub use scheduler::Scheduler;
