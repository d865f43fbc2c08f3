// Batch refresh across the chain catalog as a tracked background task.
// Callers get a BatchHandle back immediately; awaiting it yields the BatchReport.
// Optional cron schedule (UTC) fires batches; overlapping batches are skipped.

use futures_util::StreamExt;
use futures_util::stream;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::clock;
use crate::models::{BatchReport, UpdateOutcome};
use crate::updater::Updater;

/// Completion channel of one batch.
pub struct BatchHandle {
    handle: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub async fn wait(self) -> anyhow::Result<BatchReport> {
        Ok(self.handle.await?)
    }

    /// Stop tracking; the report is logged when the batch ends.
    pub fn detach(self) {
        tokio::spawn(async move {
            match self.handle.await {
                Ok(report) => info!(
                    applied = report.applied.len(),
                    no_data = report.no_data.len(),
                    failed = report.failed.len(),
                    "batch refresh finished"
                ),
                Err(e) => warn!(error = %e, "batch refresh task aborted"),
            }
        });
    }
}

/// Clears the in-flight flag when the batch task ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RefreshWorker {
    updater: Arc<Updater>,
    chain_ids: Arc<Vec<String>>,
    concurrency: usize,
    in_flight: Arc<AtomicBool>,
}

impl RefreshWorker {
    pub fn new(updater: Arc<Updater>, chain_ids: Vec<String>, concurrency: usize) -> Self {
        Self {
            updater,
            chain_ids: Arc::new(chain_ids),
            concurrency: concurrency.max(1),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn chain_count(&self) -> usize {
        self.chain_ids.len()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a batch unless one is already running (then None).
    pub fn trigger(&self) -> Option<BatchHandle> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let guard = InFlightGuard(self.in_flight.clone());
        let updater = self.updater.clone();
        let chain_ids = self.chain_ids.clone();
        let concurrency = self.concurrency;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            run_batch(&updater, &chain_ids, concurrency).await
        });
        Some(BatchHandle { handle })
    }
}

/// Update every chain with at most `concurrency` in flight. Per-chain failures end up in the report.
#[instrument(skip(updater, chain_ids), fields(operation = "run_batch", chains_count = chain_ids.len()))]
pub async fn run_batch(updater: &Updater, chain_ids: &[String], concurrency: usize) -> BatchReport {
    let mut report = BatchReport {
        started_at: clock::now_secs(),
        ..Default::default()
    };

    let outcomes: Vec<(String, UpdateOutcome)> = stream::iter(chain_ids.iter().cloned())
        .map(|chain_id| async move {
            let outcome = updater.update_one(&chain_id).await;
            (chain_id, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (chain_id, outcome) in outcomes {
        report.record(chain_id, &outcome);
    }
    report.finished_at = clock::now_secs();
    info!(
        applied = report.applied.len(),
        no_data = report.no_data.len(),
        failed = report.failed.len(),
        elapsed_secs = report.finished_at - report.started_at,
        "batch refresh complete"
    );
    report
}

/// One batch at startup, awaited, so the first reads see data.
pub async fn run_startup_refresh(worker: &RefreshWorker) -> anyhow::Result<()> {
    let Some(handle) = worker.trigger() else {
        return Ok(());
    };
    let report = handle.wait().await?;
    info!(chains = report.total(), "startup refresh complete");
    Ok(())
}

/// Fires a batch at each time of the cron expression (UTC).
pub fn spawn_schedule(worker: Arc<RefreshWorker>, schedule: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Ok(schedule) = cron::Schedule::from_str(&schedule) else {
            warn!(cron = %schedule, "invalid refresh schedule; scheduled refresh disabled");
            return;
        };
        loop {
            let now = chrono::Utc::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                match worker.trigger() {
                    Some(handle) => handle.detach(),
                    None => warn!("previous batch refresh still running; scheduled run skipped"),
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    })
}
