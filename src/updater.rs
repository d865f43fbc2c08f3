// Per-chain update: fetch -> validate -> upsert, with bounded retries and linear backoff.
// Never returns an error for the update itself; every path ends in an UpdateOutcome.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{self, SECS_PER_DAY};
use crate::config::RefreshConfig;
use crate::metrics_client::{FetchError, MetricsSource};
use crate::models::{ChainRefresh, TpsRecord, UpdateOutcome};
use crate::tps_repo::SeriesStore;
use crate::validator::{ShapeError, extract_points, filter_valid};

pub const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub max_attempts: u32,
    /// Sleep before attempt n+1 is n * backoff_step.
    pub backoff_step: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(2000),
        }
    }
}

impl From<&RefreshConfig> for UpdaterConfig {
    fn from(c: &RefreshConfig) -> Self {
        Self {
            max_attempts: c.max_attempts,
            backoff_step: c.backoff_step(),
        }
    }
}

/// Why one attempt did not reach a terminal outcome.
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("unexpected response shape: {0}")]
    Shape(#[from] ShapeError),
    #[error("store write failed: {0}")]
    Store(anyhow::Error),
}

pub struct Updater {
    source: Arc<dyn MetricsSource>,
    store: Arc<dyn SeriesStore>,
    config: UpdaterConfig,
}

impl Updater {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        store: Arc<dyn SeriesStore>,
        config: UpdaterConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub async fn update_one(&self, chain_id: &str) -> UpdateOutcome {
        self.update_one_with_attempts(chain_id, self.config.max_attempts)
            .await
    }

    #[instrument(skip(self), fields(operation = "update_one"))]
    pub async fn update_one_with_attempts(&self, chain_id: &str, max_attempts: u32) -> UpdateOutcome {
        let max_attempts = max_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(chain_id).await {
                Ok(outcome) => {
                    debug!(attempt, outcome = outcome.label(), "chain update finished");
                    return outcome;
                }
                Err(e @ AttemptError::Shape(_)) => {
                    // Retried without backoff.
                    warn!(attempt, max_attempts, kind = "shape", error = %e, "metrics response has unexpected shape");
                    last_reason = e.to_string();
                }
                Err(e) => {
                    let kind = match &e {
                        AttemptError::Store(_) => "store",
                        _ => "fetch",
                    };
                    warn!(attempt, max_attempts, kind, error = %e, "chain update attempt failed");
                    last_reason = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff_step * attempt).await;
                    }
                }
            }
        }

        error!(attempts = max_attempts, reason = %last_reason, "chain update exhausted retries");
        UpdateOutcome::Failed {
            attempts: max_attempts,
            reason: last_reason,
        }
    }

    async fn attempt(&self, chain_id: &str) -> Result<UpdateOutcome, AttemptError> {
        let body = self.source.fetch_metrics(chain_id).await?;
        let raw = extract_points(&body)?;

        let now = clock::now_secs();
        let points = filter_valid(&raw, now);
        if points.is_empty() {
            info!(raw_count = raw.len(), "no in-window points from provider");
            return Ok(UpdateOutcome::NoData);
        }

        let records: Vec<TpsRecord> = points
            .into_iter()
            .map(|p| TpsRecord::from_point(chain_id, p, now))
            .collect();
        let summary = self
            .store
            .upsert_many(&records)
            .await
            .map_err(AttemptError::Store)?;
        if summary.applied() == 0 {
            return Err(AttemptError::Store(anyhow::anyhow!(
                "all {} record writes failed",
                records.len()
            )));
        }
        if summary.failed > 0 {
            warn!(failed = summary.failed, applied = summary.applied(), "partial upsert");
        }
        Ok(UpdateOutcome::Applied { summary })
    }

    /// Single-chain refresh for callers: the outcome plus the latest record afterwards.
    pub async fn refresh_chain(&self, chain_id: &str) -> ChainRefresh {
        let outcome = self.update_one(chain_id).await;
        let latest = match self.store.latest_for_chain(chain_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!(chain_id, error = %e, "latest read after refresh failed");
                None
            }
        };
        ChainRefresh {
            chain_id: chain_id.to_string(),
            outcome,
            latest,
        }
    }

    /// Refresh only when the store has nothing for this chain. Returns the outcome if a refresh ran.
    pub async fn ensure_fresh(&self, chain_id: &str) -> anyhow::Result<Option<UpdateOutcome>> {
        if self.store.count_for_chain(chain_id).await? > 0 {
            return Ok(None);
        }
        debug!(chain_id, "no stored records; filling before read");
        Ok(Some(self.update_one(chain_id).await))
    }

    /// Stored records of the last `days`, newest first. Never writes.
    pub async fn read_history(
        &self,
        chain_id: &str,
        days: u32,
        now: i64,
    ) -> anyhow::Result<Vec<TpsRecord>> {
        let cutoff = now - i64::from(days) * SECS_PER_DAY;
        self.store.find_since(chain_id, cutoff).await
    }

    /// Never writes.
    pub async fn read_latest(&self, chain_id: &str) -> anyhow::Result<Option<TpsRecord>> {
        self.store.latest_for_chain(chain_id).await
    }

    /// `ensure_fresh`, then `read_history`.
    pub async fn get_history(&self, chain_id: &str, days: u32) -> anyhow::Result<Vec<TpsRecord>> {
        self.ensure_fresh(chain_id).await?;
        self.read_history(chain_id, days, clock::now_secs()).await
    }

    /// Latest stored record; on miss, one update and a re-read.
    pub async fn get_latest(&self, chain_id: &str) -> anyhow::Result<Option<TpsRecord>> {
        if let Some(r) = self.read_latest(chain_id).await? {
            return Ok(Some(r));
        }
        self.update_one(chain_id).await;
        self.read_latest(chain_id).await
    }
}
