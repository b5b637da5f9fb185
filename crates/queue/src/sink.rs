//! Delivery targets for record batches.

use async_trait::async_trait;
use pipeline_core::limits::MAX_ERROR_BODY_LEN;
use pipeline_core::{Error, Record, Result};
use tracing::{debug, warn};
use validator::Validate;

use crate::config::SinkConfig;

/// Destination for batches of records.
///
/// The queue keeps ownership of the batch while the call is pending and never
/// submits an empty batch. Implementations report failure through `Err`; the
/// queue requeues the batch and retries it on a later flush.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn submit(&self, batch: &[Record]) -> Result<()>;
}

/// Sink that POSTs each batch as a JSON array to an ingest endpoint.
#[derive(Clone)]
pub struct HttpSink {
    url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpSink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(config, http_client))
    }

    /// Use an existing HTTP client (shared connection pool).
    pub fn with_client(config: &SinkConfig, http_client: reqwest::Client) -> Self {
        Self {
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            http_client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn submit(&self, batch: &[Record]) -> Result<()> {
        let mut request = self.http_client.post(&self.url).json(batch);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "Ingest request failed");
            Error::transient_sink(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_body(&mut body);
            return Err(Error::sink_rejected(status.as_u16(), body));
        }

        debug!(url = %self.url, count = batch.len(), "Ingest accepted batch");
        Ok(())
    }
}

fn truncate_body(body: &mut String) {
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
}
