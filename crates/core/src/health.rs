//! Dependency health types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one probe against one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

/// Aggregated status across all dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Latest known health of one dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: String,
    pub status: ServiceStatus,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ServiceHealth {
    pub fn healthy(service: impl Into<String>, latency: Duration) -> Self {
        Self {
            service: service.into(),
            status: ServiceStatus::Healthy,
            latency_ms: latency.as_millis() as u64,
            error: None,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(service: impl Into<String>, latency: Duration, error: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: ServiceStatus::Unhealthy,
            latency_ms: latency.as_millis() as u64,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}
