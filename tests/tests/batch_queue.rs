//! Delivery guarantees of the batch queue against a scripted sink.

use integration_tests::fixtures::{numbered_record, numbered_records, queue_config, seqs};
use integration_tests::mocks::MockSink;
use pipeline_core::Scheduler;
use queue::{BatchQueue, FlushOutcome, QueueConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn queue_with(sink: &MockSink, config: QueueConfig) -> Arc<BatchQueue> {
    Arc::new(BatchQueue::new(config, Arc::new(sink.clone())).unwrap())
}

async fn wait_for_flush(queue: &BatchQueue) {
    while !queue.is_flushing() {
        tokio::task::yield_now().await;
    }
}

/// Twelve records with a threshold of ten: the first batch fails while
/// records 11 and 12 arrive, then record 13 triggers one batch carrying
/// 1..=13 in order.
#[tokio::test]
async fn test_failed_batch_precedes_records_buffered_during_flush() {
    let sink = MockSink::new();
    let gate = Arc::new(Notify::new());
    sink.hold_on(gate.clone());
    sink.fail_next(1);
    let queue = queue_with(&sink, queue_config(10));

    for record in numbered_records(9) {
        queue.enqueue(record).await;
    }
    assert_eq!(sink.calls(), 0);

    let flushing = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(numbered_record(10)).await })
    };
    wait_for_flush(&queue).await;
    assert!(queue.is_empty());

    queue.enqueue(numbered_record(11)).await;
    queue.enqueue(numbered_record(12)).await;
    assert_eq!(queue.len(), 2);

    gate.notify_one();
    flushing.await.unwrap();

    let rejected = sink.rejected_batches();
    assert_eq!(rejected.len(), 1);
    assert_eq!(seqs(&rejected[0]), (1..=10).collect::<Vec<_>>());
    assert_eq!(queue.len(), 12);

    // Permit for the next submit
    gate.notify_one();
    queue.enqueue(numbered_record(13)).await;

    let delivered = sink.delivered_batches();
    assert_eq!(delivered.len(), 1);
    assert_eq!(seqs(&delivered[0]), (1..=13).collect::<Vec<_>>());
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_requeued_batch_rides_next_size_trigger() {
    let sink = MockSink::new();
    sink.fail_next(1);
    let queue = queue_with(&sink, queue_config(10));

    for record in numbered_records(10) {
        queue.enqueue(record).await;
    }
    assert_eq!(queue.len(), 10);
    assert!(sink.delivered_batches().is_empty());

    queue.enqueue(numbered_record(11)).await;

    let delivered = sink.delivered_batches();
    assert_eq!(delivered.len(), 1);
    assert_eq!(seqs(&delivered[0]), (1..=11).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_every_record_delivered_once_after_outage() {
    let sink = MockSink::new();
    sink.set_always_fail(true);
    let queue = queue_with(&sink, queue_config(10));

    for record in numbered_records(25) {
        queue.enqueue(record).await;
    }
    assert_eq!(queue.len(), 25);
    // One attempt per enqueue from the tenth record on
    assert_eq!(sink.calls(), 16);

    sink.set_always_fail(false);
    assert_eq!(queue.flush().await, FlushOutcome::Delivered(25));

    assert_eq!(seqs(&sink.delivered_records()), (1..=25).collect::<Vec<_>>());
    assert_eq!(queue.flush().await, FlushOutcome::Empty);
}

#[tokio::test]
async fn test_concurrent_flush_is_skipped() {
    let sink = MockSink::new();
    let gate = Arc::new(Notify::new());
    sink.hold_on(gate.clone());
    let queue = queue_with(&sink, queue_config(10));

    for record in numbered_records(3) {
        queue.enqueue(record).await;
    }

    let first = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.flush().await })
    };
    wait_for_flush(&queue).await;

    queue.enqueue(numbered_record(4)).await;
    assert_eq!(queue.flush().await, FlushOutcome::InFlight);
    assert_eq!(sink.calls(), 1);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), FlushOutcome::Delivered(3));
    assert_eq!(queue.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_flushes_partial_batch() {
    let sink = MockSink::new();
    let queue = queue_with(&sink, QueueConfig::default());
    let scheduler = Scheduler::new();
    queue.start(&scheduler);

    for record in numbered_records(3) {
        queue.enqueue(record).await;
    }

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(sink.delivered_batches().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let delivered = sink.delivered_batches();
    assert_eq!(delivered.len(), 1);
    assert_eq!(seqs(&delivered[0]), vec![1, 2, 3]);

    // Empty ticks do not reach the sink
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(sink.calls(), 1);

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_bounded_buffer_drops_oldest_during_outage() {
    let sink = MockSink::new();
    sink.set_always_fail(true);
    let queue = queue_with(&sink, queue_config(5).with_max_buffered(Some(8)));

    for record in numbered_records(12) {
        queue.enqueue(record).await;
    }
    assert_eq!(queue.len(), 8);

    sink.set_always_fail(false);
    queue.flush().await;
    assert_eq!(seqs(&sink.delivered_records()), (5..=12).collect::<Vec<_>>());
}

/// A tick flush still waiting on the sink at shutdown must not swallow the
/// final flush.
#[tokio::test(start_paused = true)]
async fn test_final_flush_after_shutdown_interrupts_tick_flush() {
    let sink = MockSink::new();
    let gate = Arc::new(Notify::new());
    sink.hold_on(gate.clone());
    let queue = queue_with(&sink, QueueConfig::default());
    let scheduler = Scheduler::new();
    queue.start(&scheduler);

    for record in numbered_records(2) {
        queue.enqueue(record).await;
    }

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(queue.is_flushing());
    assert!(queue.is_empty());

    scheduler.shutdown().await;
    assert!(!queue.is_flushing());
    assert_eq!(queue.len(), 2);

    gate.notify_one();
    assert_eq!(queue.flush().await, FlushOutcome::Delivered(2));
    assert_eq!(seqs(&sink.delivered_records()), vec![1, 2]);
}
