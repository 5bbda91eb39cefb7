use crate::config::AgentConfig;
use pulse_common::{Metric, Signer};
use reqwest::{Client, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Connect, timeout or body failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected batch with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Signs sampled metrics and POSTs them as one JSON array to `/updates`.
pub struct Reporter {
    client: Client,
    url: String,
    signer: Signer,
}

impl Reporter {
    pub fn new(config: &AgentConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/updates", config.base_url()),
            signer: Signer::new(&config.key),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends `metrics` in one request. Returns how many were sent; an empty
    /// batch is skipped.
    pub async fn send(&self, metrics: Vec<Metric>) -> Result<usize, ReportError> {
        if metrics.is_empty() {
            return Ok(0);
        }
        let count = metrics.len();
        let signed: Vec<Metric> = metrics.into_iter().map(|m| self.signer.signed(m)).collect();

        let response = self.client.post(&self.url).json(&signed).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Rejected { status, body });
        }
        Ok(count)
    }

    /// [`send`](Self::send), logging the outcome. Failed batches are dropped.
    pub async fn report(&self, metrics: Vec<Metric>) {
        match self.send(metrics).await {
            Ok(0) => tracing::debug!("Nothing to report"),
            Ok(count) => tracing::info!(count, url = %self.url, "Metrics reported"),
            Err(e) => tracing::warn!(error = %e, url = %self.url, "Report failed, batch dropped"),
        }
    }
}
