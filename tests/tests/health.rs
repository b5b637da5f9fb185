//! Health aggregation across mixed probes.

use health::{HealthAggregator, HealthConfig, HealthProbe};
use integration_tests::mocks::{MockProbe, ProbeMode};
use pipeline_core::{HealthStatus, Scheduler, ServiceStatus};
use std::sync::Arc;
use std::time::Duration;

fn aggregator(probes: Vec<Arc<dyn HealthProbe>>, timeout: Duration) -> Arc<HealthAggregator> {
    let config = HealthConfig::default().with_probe_timeout(timeout);
    Arc::new(HealthAggregator::new(config, probes).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_three_probes_one_failing() {
    let agg = aggregator(
        vec![
            MockProbe::new("database", ProbeMode::Healthy) as Arc<dyn HealthProbe>,
            MockProbe::new("auth", ProbeMode::Failing),
            MockProbe::new("storage", ProbeMode::Healthy),
        ],
        Duration::from_secs(10),
    );

    let map = agg.check_health().await;

    assert_eq!(map.len(), 3);
    assert_eq!(map["database"].status, ServiceStatus::Healthy);
    assert_eq!(map["storage"].status, ServiceStatus::Healthy);
    assert_eq!(map["auth"].status, ServiceStatus::Unhealthy);
    assert_eq!(map["auth"].error.as_deref(), Some("connection refused"));
    assert_eq!(agg.report().status, HealthStatus::Degraded);
}

/// A hung probe neither delays the others' entries nor blocks the cycle
/// past its timeout.
#[tokio::test(start_paused = true)]
async fn test_hung_probe_does_not_block_others() {
    let agg = aggregator(
        vec![
            MockProbe::with_delay("database", ProbeMode::Healthy, Duration::from_millis(10))
                as Arc<dyn HealthProbe>,
            MockProbe::new("storage", ProbeMode::Hanging),
        ],
        Duration::from_secs(5),
    );

    let cycle = {
        let agg = agg.clone();
        tokio::spawn(async move { agg.check_health().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(agg.get("database").unwrap().is_healthy());
    assert!(agg.get("storage").is_none());
    assert_eq!(agg.report().pending, vec!["storage".to_string()]);

    let map = cycle.await.unwrap();
    let storage = &map["storage"];
    assert_eq!(storage.status, ServiceStatus::Unhealthy);
    assert_eq!(storage.error.as_deref(), Some("timed out after 5000 ms"));
    assert!(storage.latency_ms >= 5000);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_replaces_entry_on_next_tick() {
    let auth = MockProbe::new("auth", ProbeMode::Failing);
    let agg = Arc::new(
        HealthAggregator::new(
            HealthConfig::default(),
            vec![auth.clone() as Arc<dyn HealthProbe>],
        )
        .unwrap(),
    );
    let scheduler = Scheduler::new();
    agg.start(&scheduler);

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(agg.get("auth").unwrap().status, ServiceStatus::Unhealthy);
    assert!(!agg.is_ready());

    auth.set_mode(ProbeMode::Healthy);
    tokio::time::sleep(Duration::from_secs(300)).await;

    let entry = agg.get("auth").unwrap();
    assert!(entry.is_healthy());
    assert!(entry.error.is_none());
    assert_eq!(auth.runs(), 2);
    assert!(agg.is_ready());
}
