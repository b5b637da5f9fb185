//! Test fixtures and record generators.

use pipeline_core::record::kinds;
use pipeline_core::Record;
use queue::QueueConfig;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Event record carrying its sequence number under `seq`.
pub fn numbered_record(seq: usize) -> Record {
    let mut payload = Map::new();
    payload.insert("event_name".into(), Value::String("test_event".into()));
    payload.insert("seq".into(), json!(seq));
    Record::new(kinds::EVENT, payload)
}

/// Records numbered `1..=n`.
pub fn numbered_records(n: usize) -> Vec<Record> {
    (1..=n).map(numbered_record).collect()
}

/// Sequence numbers of `records`, in order.
pub fn seqs(records: &[Record]) -> Vec<usize> {
    records
        .iter()
        .filter_map(|r| r.payload().get("seq").and_then(Value::as_u64))
        .map(|n| n as usize)
        .collect()
}

/// Queue config with the given threshold and a long flush period, so only
/// the size trigger fires unless a test advances time.
pub fn queue_config(batch_size: usize) -> QueueConfig {
    QueueConfig::default()
        .with_batch_size(batch_size)
        .with_flush_interval(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seqs_round_trip() {
        assert_eq!(seqs(&numbered_records(3)), vec![1, 2, 3]);
    }
}
