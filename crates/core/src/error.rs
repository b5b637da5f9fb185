//! Unified error types for the telemetry pipeline.
//!
//! Error codes:
//! - SINK_001-003: Batch delivery errors
//! - PROBE_001-002: Dependency check errors
//! - SER_001: Serialization errors
//! - CFG_001: Configuration errors
//! - INT_001: Internal errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the telemetry pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// SINK_001: network or remote failure while delivering a batch.
    #[error("[SINK_001] transient sink failure: {reason}")]
    TransientSink { reason: String },

    /// SINK_002: the sink call did not settle within the flush timeout.
    #[error("[SINK_002] sink timed out after {timeout_ms} ms")]
    SinkTimeout { timeout_ms: u64 },

    /// SINK_003: the sink answered but refused the batch.
    #[error("[SINK_003] sink rejected batch with status {status}: {body}")]
    SinkRejected { status: u16, body: String },

    /// PROBE_001: a dependency check returned an error.
    #[error("[PROBE_001] {service}: {reason}")]
    Probe { service: String, reason: String },

    /// PROBE_002: a dependency check did not settle within the probe timeout.
    #[error("[PROBE_002] {service}: timed out after {timeout_ms} ms")]
    ProbeTimeout { service: String, timeout_ms: u64 },

    #[error("[SER_001] serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("[CFG_001] configuration error: {0}")]
    Config(String),

    #[error("[INT_001] internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn transient_sink(reason: impl Into<String>) -> Self {
        Self::TransientSink {
            reason: reason.into(),
        }
    }

    pub fn sink_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::SinkRejected {
            status,
            body: body.into(),
        }
    }

    pub fn probe(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Probe {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TransientSink { .. } => "SINK_001",
            Self::SinkTimeout { .. } => "SINK_002",
            Self::SinkRejected { .. } => "SINK_003",
            Self::Probe { .. } => "PROBE_001",
            Self::ProbeTimeout { .. } => "PROBE_002",
            Self::Serialization(_) => "SER_001",
            Self::Config(_) => "CFG_001",
            Self::Internal(_) => "INT_001",
        }
    }

    /// Whether retrying the same operation later can succeed.
    ///
    /// Every sink error is treated as transient, including rejections:
    /// the queue requeues and tries again on the next trigger.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientSink { .. }
                | Self::SinkTimeout { .. }
                | Self::SinkRejected { .. }
                | Self::Probe { .. }
                | Self::ProbeTimeout { .. }
        )
    }

    /// Human-readable reason without the error code prefix.
    pub fn reason(&self) -> String {
        match self {
            Self::TransientSink { reason } => reason.clone(),
            Self::SinkTimeout { timeout_ms } => format!("timed out after {} ms", timeout_ms),
            Self::SinkRejected { status, body } => format!("status {}: {}", status, body),
            Self::Probe { reason, .. } => reason.clone(),
            Self::ProbeTimeout { timeout_ms, .. } => format!("timed out after {} ms", timeout_ms),
            Self::Serialization(e) => e.to_string(),
            Self::Config(msg) | Self::Internal(msg) => msg.clone(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(errors.to_string())
    }
}
