//! Health probes.

use async_trait::async_trait;
use pipeline_core::{Error, Result, ServiceHealth};
use std::time::Duration;
use telemetry::metrics;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ServiceProbeConfig;

/// One capability check against one named dependency.
///
/// Implement [`check`](HealthProbe::check); callers use
/// [`run`](HealthProbe::run), which never fails.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Key under which results are stored.
    fn service(&self) -> &str;

    /// Perform the check once.
    async fn check(&self) -> Result<()>;

    /// Run the check with a deadline and convert the outcome to a status.
    ///
    /// Latency covers the check from just before it starts until it settles,
    /// including a timeout.
    async fn run(&self, timeout: Duration) -> ServiceHealth {
        let service = self.service();
        let start = Instant::now();

        let outcome = match tokio::time::timeout(timeout, self.check()).await {
            Ok(result) => result,
            Err(_) => Err(Error::ProbeTimeout {
                service: service.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };
        let latency = start.elapsed();

        metrics().probe_runs.inc();
        metrics().probe_latency_ms.observe(latency.as_millis() as u64);

        match outcome {
            Ok(()) => {
                debug!(service = %service, latency_ms = %latency.as_millis(), "Probe healthy");
                ServiceHealth::healthy(service, latency)
            }
            Err(e) => {
                metrics().probe_failures.inc();
                warn!(
                    service = %service,
                    code = e.code(),
                    error = %e.reason(),
                    latency_ms = %latency.as_millis(),
                    "Probe unhealthy"
                );
                ServiceHealth::unhealthy(service, latency, e.reason())
            }
        }
    }
}

/// Probe that issues a GET and inspects the status code.
pub struct HttpProbe {
    service: String,
    url: String,
    expected_status: Option<u16>,
    http_client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(config: &ServiceProbeConfig, http_client: reqwest::Client) -> Self {
        Self {
            service: config.name.clone(),
            url: config.url.clone(),
            expected_status: config.expected_status,
            http_client,
        }
    }

    fn accepts(&self, status: reqwest::StatusCode) -> bool {
        match self.expected_status {
            Some(expected) => status.as_u16() == expected,
            None => status.is_success(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn service(&self) -> &str {
        &self.service
    }

    async fn check(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::probe(&self.service, e.to_string()))?;

        let status = response.status();
        if self.accepts(status) {
            Ok(())
        } else {
            Err(Error::probe(
                &self.service,
                format!("unexpected status {}", status.as_u16()),
            ))
        }
    }
}
