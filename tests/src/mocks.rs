//! Mock implementations for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use pipeline_core::{Error, Record, Result};
use queue::Sink;
use health::HealthProbe;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Sink that captures delivered batches in memory.
///
/// Failures are scripted per call: each queued `true` fails one submit, in
/// order. Once the script runs out every submit succeeds unless
/// [`set_always_fail`](MockSink::set_always_fail) is on.
#[derive(Clone, Default)]
pub struct MockSink {
    /// Batches accepted by the sink.
    delivered: Arc<Mutex<Vec<Vec<Record>>>>,
    /// Batches the sink was handed and rejected.
    rejected: Arc<Mutex<Vec<Vec<Record>>>>,
    script: Arc<Mutex<VecDeque<bool>>>,
    always_fail: Arc<Mutex<bool>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submits.
    pub fn fail_next(&self, n: usize) {
        self.script.lock().extend(std::iter::repeat(true).take(n));
    }

    pub fn set_always_fail(&self, fail: bool) {
        *self.always_fail.lock() = fail;
    }

    /// Hold every submit until `gate` is notified once per call.
    pub fn hold_on(&self, gate: Arc<Notify>) {
        *self.gate.lock() = Some(gate);
    }

    pub fn delivered_batches(&self) -> Vec<Vec<Record>> {
        self.delivered.lock().clone()
    }

    pub fn rejected_batches(&self) -> Vec<Vec<Record>> {
        self.rejected.lock().clone()
    }

    /// Every delivered record in delivery order.
    pub fn delivered_records(&self) -> Vec<Record> {
        self.delivered.lock().iter().flatten().cloned().collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for MockSink {
    async fn submit(&self, batch: &[Record]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let scripted = self.script.lock().pop_front().unwrap_or(false);
        if scripted || *self.always_fail.lock() {
            self.rejected.lock().push(batch.to_vec());
            return Err(Error::transient_sink("mock sink failure"));
        }

        self.delivered.lock().push(batch.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    Healthy,
    Failing,
    /// Never completes on its own
    Hanging,
}

/// Probe with a switchable outcome and a fixed delay.
pub struct MockProbe {
    name: String,
    mode: Mutex<ProbeMode>,
    delay: Duration,
    runs: AtomicUsize,
}

impl MockProbe {
    pub fn new(name: &str, mode: ProbeMode) -> Arc<Self> {
        Self::with_delay(name, mode, Duration::ZERO)
    }

    pub fn with_delay(name: &str, mode: ProbeMode, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            mode: Mutex::new(mode),
            delay,
            runs: AtomicUsize::new(0),
        })
    }

    pub fn set_mode(&self, mode: ProbeMode) {
        *self.mode.lock() = mode;
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for MockProbe {
    fn service(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock();

        if mode == ProbeMode::Hanging {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.delay).await;

        match mode {
            ProbeMode::Failing => Err(Error::probe(&self.name, "connection refused")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::numbered_records;

    #[tokio::test]
    async fn test_mock_sink_scripted_failures() {
        let sink = MockSink::new();
        sink.fail_next(1);
        let batch = numbered_records(2);

        assert!(sink.submit(&batch).await.is_err());
        assert!(sink.submit(&batch).await.is_ok());
        assert_eq!(sink.calls(), 2);
        assert_eq!(sink.rejected_batches().len(), 1);
        assert_eq!(sink.delivered_records().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_probe_modes() {
        let probe = MockProbe::new("auth", ProbeMode::Failing);
        assert!(probe.check().await.is_err());

        probe.set_mode(ProbeMode::Healthy);
        assert!(probe.check().await.is_ok());
        assert_eq!(probe.runs(), 2);
    }
}
