//! Producers that feed the batch queue.
//!
//! - Event tracking (named application events)
//! - Performance metrics (screen loads, API latency, periodic system samples)

pub mod collector;
pub mod sampler;
pub mod tracker;

pub use collector::*;
pub use sampler::*;
pub use tracker::*;
