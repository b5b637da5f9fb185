//! In-memory batch queue with size- and time-triggered delivery.
//!
//! Records accumulate in a live buffer. A flush detaches the whole buffer in
//! one step, hands it to the [`Sink`], and on failure moves the records back
//! to the front of the buffer, ahead of anything enqueued in the meantime.
//! At most one flush is in flight at a time.

use parking_lot::Mutex;
use pipeline_core::{Error, Record, Result, Scheduler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use telemetry::metrics;
use tokio::time::Instant;
use tracing::{debug, warn};
use validator::Validate;

use crate::config::QueueConfig;
use crate::sink::Sink;

/// What a call to [`BatchQueue::flush`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Empty,
    /// Another flush was already in flight; nothing was touched.
    InFlight,
    /// The sink accepted this many records.
    Delivered(usize),
    /// The sink failed; this many records went back to the front of the buffer.
    Requeued(usize),
}

impl FlushOutcome {
    pub fn delivered(&self) -> usize {
        match self {
            Self::Delivered(n) => *n,
            _ => 0,
        }
    }
}

/// Batching queue in front of a [`Sink`].
pub struct BatchQueue {
    config: QueueConfig,
    sink: Arc<dyn Sink>,
    buffer: Mutex<Vec<Record>>,
    flushing: AtomicBool,
}

impl BatchQueue {
    pub fn new(config: QueueConfig, sink: Arc<dyn Sink>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            buffer: Mutex::new(Vec::with_capacity(config.batch_size)),
            config,
            sink,
            flushing: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Number of buffered records, excluding an in-flight batch.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Register the periodic flush with the scheduler.
    pub fn start(self: &Arc<Self>, scheduler: &Scheduler) {
        let queue = Arc::clone(self);
        scheduler.every("queue-flush", self.config.flush_interval(), move || {
            let queue = queue.clone();
            async move {
                queue.flush().await;
            }
        });
    }

    /// Buffer a record. Flushes before returning once the batch size is reached.
    ///
    /// Never fails: delivery problems are logged and retried later.
    pub async fn enqueue(&self, record: Record) {
        metrics().records_enqueued.inc();

        let should_flush = {
            let mut buffer = self.buffer.lock();
            buffer.push(record);
            self.enforce_bound(&mut buffer);
            buffer.len() >= self.config.batch_size
        };

        if should_flush {
            self.flush().await;
        }
    }

    /// Deliver everything currently buffered as one batch.
    pub async fn flush(&self) -> FlushOutcome {
        let Some(_guard) = FlushGuard::acquire(&self.flushing) else {
            metrics().flushes_skipped.inc();
            debug!("Flush already in flight, skipping");
            return FlushOutcome::InFlight;
        };

        let Some(mut batch) = self.detach() else {
            return FlushOutcome::Empty;
        };

        let count = batch.records.len();
        let start = Instant::now();
        let result = self.submit(&batch.records).await;
        metrics()
            .flush_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match result {
            Ok(()) => {
                batch.settle();
                metrics().batches_delivered.inc();
                metrics().records_delivered.inc_by(count as u64);
                debug!(
                    count = count,
                    latency_ms = %start.elapsed().as_millis(),
                    "Flushed batch"
                );
                FlushOutcome::Delivered(count)
            }
            Err(e) => {
                metrics().sink_failures.inc();
                warn!(
                    count = count,
                    code = e.code(),
                    transient = e.is_transient(),
                    error = %e.reason(),
                    "Failed to flush batch, requeueing"
                );
                FlushOutcome::Requeued(batch.requeue())
            }
        }
    }

    async fn submit(&self, records: &[Record]) -> Result<()> {
        let timeout = self.config.flush_timeout();
        match tokio::time::timeout(timeout, self.sink.submit(records)).await {
            Ok(result) => result,
            Err(_) => Err(Error::SinkTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Swap the live buffer for an empty one.
    fn detach(&self) -> Option<InFlightBatch<'_>> {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return None;
        }

        let records = std::mem::replace(
            &mut *buffer,
            Vec::with_capacity(self.config.batch_size),
        );
        metrics().buffer_depth.set(0);

        Some(InFlightBatch {
            queue: self,
            records,
        })
    }

    /// Put a failed batch back ahead of newer records.
    ///
    /// Returns how many of them survived the buffer bound. The batch sits at
    /// the front, so it loses records before anything newer does.
    fn requeue(&self, mut records: Vec<Record>) -> usize {
        let count = records.len();
        let mut buffer = self.buffer.lock();

        records.append(&mut *buffer);
        *buffer = records;
        let dropped = self.enforce_bound(&mut buffer);
        let requeued = count.saturating_sub(dropped);

        metrics().records_requeued.inc_by(requeued as u64);
        debug!(
            requeued = requeued,
            dropped = count - requeued,
            buffered = buffer.len(),
            "Requeued batch"
        );
        requeued
    }

    /// Drop the oldest records beyond `max_buffered`. Returns the number dropped.
    fn enforce_bound(&self, buffer: &mut Vec<Record>) -> usize {
        let mut excess = 0;
        if let Some(max) = self.config.max_buffered {
            if buffer.len() > max {
                excess = buffer.len() - max;
                buffer.drain(..excess);
                metrics().records_dropped.inc_by(excess as u64);
                warn!(dropped = excess, max_buffered = max, "Buffer full, dropped oldest records");
            }
        }
        metrics().buffer_depth.set(buffer.len() as u64);
        excess
    }
}

/// In-flight marker, cleared on drop so a cancelled flush releases it.
struct FlushGuard<'a>(&'a AtomicBool);

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A detached batch. Unless settled, its records return to the queue on drop,
/// which also covers a flush future cancelled mid-submit.
struct InFlightBatch<'a> {
    queue: &'a BatchQueue,
    records: Vec<Record>,
}

impl InFlightBatch<'_> {
    fn settle(&mut self) {
        self.records.clear();
    }

    /// Move the records back to the queue now.
    fn requeue(mut self) -> usize {
        let records = std::mem::take(&mut self.records);
        self.queue.requeue(records)
    }
}

impl Drop for InFlightBatch<'_> {
    fn drop(&mut self) {
        if !self.records.is_empty() {
            self.queue.requeue(std::mem::take(&mut self.records));
        }
    }
}
