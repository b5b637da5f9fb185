//! Health check aggregation.

use futures::future::join_all;
use parking_lot::RwLock;
use pipeline_core::{Error, HealthStatus, Result, Scheduler, ServiceHealth};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::config::HealthConfig;
use crate::probe::{HealthProbe, HttpProbe};

/// Aggregated view of the status map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Latest result per dependency, sorted by name
    pub services: Vec<ServiceHealth>,
    /// Registered probes that have not completed a run yet
    pub pending: Vec<String>,
}

/// Runs a fixed set of probes concurrently and keeps the latest result per
/// dependency.
///
/// A probe that has never completed is absent from the map. Each completed
/// run replaces the previous entry for its key as soon as it settles, so a
/// reader may see a map that is partly from the current cycle.
pub struct HealthAggregator {
    config: HealthConfig,
    probes: Vec<Arc<dyn HealthProbe>>,
    status: RwLock<HashMap<String, ServiceHealth>>,
}

impl HealthAggregator {
    pub fn new(config: HealthConfig, probes: Vec<Arc<dyn HealthProbe>>) -> Result<Self> {
        config.validate()?;

        let mut seen = HashSet::new();
        for probe in &probes {
            if !seen.insert(probe.service().to_string()) {
                return Err(Error::config(format!(
                    "duplicate health probe {:?}",
                    probe.service()
                )));
            }
        }

        Ok(Self {
            config,
            status: RwLock::new(HashMap::with_capacity(probes.len())),
            probes,
        })
    }

    /// Build one HTTP probe per configured service.
    pub fn from_config(config: HealthConfig, http_client: reqwest::Client) -> Result<Self> {
        let probes = config
            .services
            .iter()
            .map(|service| {
                Arc::new(HttpProbe::new(service, http_client.clone())) as Arc<dyn HealthProbe>
            })
            .collect();

        Self::new(config, probes)
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.service()).collect()
    }

    /// Register the periodic health check with the scheduler.
    pub fn start(self: &Arc<Self>, scheduler: &Scheduler) {
        let aggregator = Arc::clone(self);
        scheduler.every("health-check", self.config.check_interval(), move || {
            let aggregator = aggregator.clone();
            async move {
                aggregator.check_health().await;
            }
        });
    }

    /// Run every probe concurrently and wait for all of them to settle.
    ///
    /// Returns the status map after the cycle.
    pub async fn check_health(&self) -> HashMap<String, ServiceHealth> {
        let timeout = self.config.probe_timeout();
        debug!(probes = self.probes.len(), "Running health checks");

        join_all(self.probes.iter().map(|probe| async move {
            let health = probe.run(timeout).await;
            self.status
                .write()
                .insert(probe.service().to_string(), health);
        }))
        .await;

        let snapshot = self.snapshot();
        let unhealthy = snapshot.values().filter(|h| !h.is_healthy()).count();
        info!(
            services = snapshot.len(),
            unhealthy = unhealthy,
            "Health check cycle complete"
        );
        snapshot
    }

    /// Copy of the current status map.
    pub fn snapshot(&self) -> HashMap<String, ServiceHealth> {
        self.status.read().clone()
    }

    pub fn get(&self, service: &str) -> Option<ServiceHealth> {
        self.status.read().get(service).cloned()
    }

    /// Summarize the status map.
    pub fn report(&self) -> HealthReport {
        let status = self.status.read();

        let mut services: Vec<ServiceHealth> = status.values().cloned().collect();
        services.sort_by(|a, b| a.service.cmp(&b.service));

        let pending: Vec<String> = self
            .probes
            .iter()
            .map(|p| p.service())
            .filter(|name| !status.contains_key(*name))
            .map(str::to_string)
            .collect();

        let all_healthy = pending.is_empty() && services.iter().all(|s| s.is_healthy());
        let any_healthy = services.iter().any(|s| s.is_healthy());

        let overall = if all_healthy {
            HealthStatus::Healthy
        } else if any_healthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status: overall,
            services,
            pending,
        }
    }

    /// True once every probe has reported healthy at least once and is healthy now.
    pub fn is_ready(&self) -> bool {
        self.report().status.is_healthy()
    }
}
