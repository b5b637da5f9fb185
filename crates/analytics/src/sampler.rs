//! System readings for the metrics collector.

use async_trait::async_trait;
use pipeline_core::limits::DEFAULT_BATTERY_LEVEL;
use pipeline_core::Result;
use serde::{Deserialize, Serialize};

/// One periodic reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub memory_usage_mb: f64,
    pub battery_level: f64,
}

/// Source of system readings.
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self) -> Result<SystemSample>;
}

/// Reads the resident set size of this process.
///
/// Battery level has no portable source and is reported as full.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSampler;

impl ProcessSampler {
    #[cfg(target_os = "linux")]
    async fn resident_mb(&self) -> Result<f64> {
        use pipeline_core::Error;

        let statm = tokio::fs::read_to_string("/proc/self/statm")
            .await
            .map_err(|e| Error::internal(format!("failed to read /proc/self/statm: {}", e)))?;
        parse_statm_resident_mb(&statm, PAGE_SIZE)
            .ok_or_else(|| Error::internal("unexpected /proc/self/statm format"))
    }

    #[cfg(not(target_os = "linux"))]
    async fn resident_mb(&self) -> Result<f64> {
        Ok(0.0)
    }
}

#[async_trait]
impl Sampler for ProcessSampler {
    async fn sample(&self) -> Result<SystemSample> {
        Ok(SystemSample {
            memory_usage_mb: self.resident_mb().await?,
            battery_level: DEFAULT_BATTERY_LEVEL,
        })
    }
}

// Linux on x86_64 and aarch64 default.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const PAGE_SIZE: u64 = 4096;

/// statm fields: size resident shared text lib data dt (in pages).
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_statm_resident_mb(statm: &str, page_size: u64) -> Option<f64> {
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some((resident_pages * page_size) as f64 / 1024.0 / 1024.0)
}
