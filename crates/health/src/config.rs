//! Health check configuration.

use pipeline_core::limits::{DEFAULT_HEALTH_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// One HTTP-checked dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServiceProbeConfig {
    /// Key in the status map
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Endpoint hit with a GET on every check
    #[validate(url)]
    pub url: String,
    /// Status that counts as healthy; any 2xx when unset
    #[serde(default)]
    #[validate(range(min = 100, max = 599))]
    pub expected_status: Option<u16>,
}

impl ServiceProbeConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expected_status: None,
        }
    }
}

/// Health aggregator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_names"))]
pub struct HealthConfig {
    /// Period of the health check tick in milliseconds
    #[serde(default = "default_check_interval_ms")]
    #[validate(range(min = 1))]
    pub check_interval_ms: u64,
    /// Upper bound on a single probe in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    #[validate(range(min = 1))]
    pub probe_timeout_ms: u64,
    /// Dependencies to probe
    #[serde(default = "default_services")]
    #[validate(nested)]
    pub services: Vec<ServiceProbeConfig>,
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_HEALTH_INTERVAL_MS
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_services() -> Vec<ServiceProbeConfig> {
    vec![
        ServiceProbeConfig::new("database", "http://localhost:8080/rest/v1/health_check"),
        ServiceProbeConfig::new("auth", "http://localhost:8080/auth/v1/health"),
        ServiceProbeConfig::new("storage", "http://localhost:8080/storage/v1/bucket"),
    ]
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            services: default_services(),
        }
    }
}

impl HealthConfig {
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceProbeConfig>) -> Self {
        self.services = services;
        self
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Service names key the status map, so they must be distinct.
fn validate_unique_names(config: &HealthConfig) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for service in &config.services {
        if !seen.insert(service.name.as_str()) {
            let mut err = ValidationError::new("duplicate_service");
            err.message = Some(Cow::Owned(format!(
                "duplicate service name {:?}",
                service.name
            )));
            return Err(err);
        }
    }
    Ok(())
}
