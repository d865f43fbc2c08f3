// Metrics provider client: one timed GET per chain, no retry, no validation.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use crate::config::ProviderConfig;

/// Every variant is the same "fetch failed" condition to callers; the variant only
/// says why, for logs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch failed: request timed out after {0:?}")]
    Timeout(Duration),
    #[error("fetch failed: provider returned HTTP {0}")]
    Status(u16),
    #[error("fetch failed: {0}")]
    Request(String),
    #[error("fetch failed: body is not JSON: {0}")]
    Decode(String),
}

/// Source of raw provider responses for a chain. The body is returned untouched.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch_metrics(&self, chain_id: &str) -> Result<serde_json::Value, FetchError>;
}

pub struct HttpMetricsClient {
    client: reqwest::Client,
    base_url: String,
    time_interval: String,
    page_size: u32,
    timeout: Duration,
}

impl HttpMetricsClient {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            time_interval: config.time_interval.clone(),
            page_size: config.page_size,
            timeout: config.timeout(),
        })
    }

    pub fn metrics_url(&self, chain_id: &str) -> String {
        format!("{}/chains/{}/metrics/avgTps", self.base_url, chain_id)
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsClient {
    #[instrument(skip(self), fields(client = "provider", operation = "fetch_metrics"))]
    async fn fetch_metrics(&self, chain_id: &str) -> Result<serde_json::Value, FetchError> {
        let page_size = self.page_size.to_string();
        let resp = self
            .client
            .get(self.metrics_url(chain_id))
            .query(&[
                ("timeInterval", self.time_interval.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        resp.json::<serde_json::Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Decode(e.to_string())
            }
        })
    }
}
