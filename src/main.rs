//! Telemetry Pipeline
//!
//! Client-side delivery of analytics and performance records:
//! - Batched delivery to an HTTP ingest endpoint with requeue on failure
//! - Periodic health probes against backing services
//! - Event tracking and periodic system sampling

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use analytics::{AnalyticsEvent, CollectorConfig, EventTracker, MetricsCollector};
use health::{HealthAggregator, HealthConfig};
use pipeline_core::Scheduler;
use queue::{BatchQueue, FlushOutcome, HttpSink, QueueConfig, SinkConfig};
use telemetry::{init_tracing_from_env, metrics};
use validator::Validate;

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    queue: QueueConfig,

    #[serde(default)]
    sink: SinkConfig,

    #[serde(default)]
    health: HealthConfig,

    #[serde(default)]
    collector: CollectorConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Telemetry Pipeline v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        sink_url = %config.sink.url,
        batch_size = config.queue.batch_size,
        flush_interval_ms = config.queue.flush_interval_ms,
        services = config.health.services.len(),
        "Loaded configuration"
    );

    let sink = Arc::new(HttpSink::new(&config.sink).context("Failed to create HTTP sink")?);
    let queue = Arc::new(
        BatchQueue::new(config.queue.clone(), sink).context("Invalid queue configuration")?,
    );

    let probe_client = reqwest::Client::builder()
        .timeout(config.health.probe_timeout())
        .build()
        .context("Failed to build probe HTTP client")?;
    let aggregator = Arc::new(
        HealthAggregator::from_config(config.health.clone(), probe_client)
            .context("Invalid health configuration")?,
    );

    let tracker = EventTracker::new(queue.clone());
    let collector = Arc::new(
        MetricsCollector::with_process_sampler(config.collector.clone(), queue.clone())
            .context("Invalid collector configuration")?,
    );

    let scheduler = Scheduler::new();
    queue.start(&scheduler);
    aggregator.start(&scheduler);
    collector.start(&scheduler);
    info!(tasks = ?scheduler.task_names(), "Started periodic tasks");

    // Startup health check
    aggregator.check_health().await;
    let report = aggregator.report();
    if report.status.is_healthy() {
        info!("All services healthy");
    } else if report.status.is_serving() {
        warn!(status = ?report.status, "Some services unhealthy");
    } else {
        error!(status = ?report.status, pending = ?report.pending, "No services healthy");
    }
    for service in &report.services {
        info!(
            service = %service.service,
            status = ?service.status,
            latency_ms = service.latency_ms,
            error = service.error.as_deref().unwrap_or("none"),
            "Service health"
        );
    }

    tracker.track_event(AnalyticsEvent::new("pipeline_started")).await;

    shutdown_signal().await;

    info!("Shutting down...");

    // Stop ticks before the final flush so it runs alone; a tick flush cut
    // short here puts its batch back first
    scheduler.shutdown().await;

    match queue.flush().await {
        FlushOutcome::Delivered(n) => info!(delivered = n, "Final flush complete"),
        FlushOutcome::Empty => info!("Nothing left to flush"),
        FlushOutcome::Requeued(n) => {
            error!(records = n, "Final flush failed, discarding buffered records");
        }
        FlushOutcome::InFlight => {
            error!(
                records = queue.len(),
                "Final flush skipped while another flush was in flight, discarding buffered records"
            );
        }
    }

    let snapshot = metrics().snapshot();
    info!(
        records_enqueued = snapshot.records_enqueued,
        records_delivered = snapshot.records_delivered,
        records_dropped = snapshot.records_dropped,
        sink_failures = snapshot.sink_failures,
        "Shutdown complete"
    );
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. PIPELINE_QUEUE__BATCH_SIZE
        .add_source(
            config::Environment::with_prefix("PIPELINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat override for the ingest credential
    if let Ok(api_key) = std::env::var("PIPELINE_API_KEY") {
        config.sink.api_key = Some(api_key);
    }

    config.queue.validate().context("Invalid queue configuration")?;
    config.sink.validate().context("Invalid sink configuration")?;
    config.health.validate().context("Invalid health configuration")?;
    config
        .collector
        .validate()
        .context("Invalid collector configuration")?;

    if config.sink.timeout() > config.queue.flush_timeout() {
        warn!(
            sink_timeout_ms = config.sink.timeout_ms,
            flush_timeout_ms = config.queue.flush_timeout_ms,
            "Sink timeout exceeds flush timeout; flushes will be cut short"
        );
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
