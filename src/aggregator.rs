// Network-wide views over the TPS series: current snapshot and per-timestamp history.
// Read-only. Store errors propagate; data anomalies are logged and excluded.

use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::clock::{SECS_PER_DAY, SECS_PER_MINUTE, iso_date, round2};
use crate::models::{NetworkHistoryPoint, NetworkSnapshot, TpsRecord};
use crate::tps_repo::SeriesStore;

pub const DEFAULT_NETWORK_HISTORY_DAYS: u32 = 7;

/// Readings older than this are not "current".
pub const SNAPSHOT_WINDOW_SECS: i64 = SECS_PER_DAY;

pub struct Aggregator {
    store: Arc<dyn SeriesStore>,
    chain_ids: Vec<String>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn SeriesStore>, chain_ids: Vec<String>) -> Self {
        Self { store, chain_ids }
    }

    pub fn chain_ids(&self) -> &[String] {
        &self.chain_ids
    }

    /// Snapshot over the whole catalog.
    pub async fn network_snapshot(&self, now: i64) -> anyhow::Result<NetworkSnapshot> {
        self.snapshot(&self.chain_ids, now).await
    }

    /// Sum of each chain's latest reading within [now - 24h, now].
    #[instrument(skip(self, chains), fields(operation = "snapshot", chains_count = chains.len()))]
    pub async fn snapshot(&self, chains: &[String], now: i64) -> anyhow::Result<NetworkSnapshot> {
        let lower = now - SNAPSHOT_WINDOW_SECS;
        let latest = try_join_all(
            chains
                .iter()
                .map(|id| self.store.latest_for_chain_within_window(id, lower, now)),
        )
        .await?;

        let valid: Vec<TpsRecord> = latest
            .into_iter()
            .flatten()
            // Re-checked here; a store may hand back rows outside the window.
            .filter(|r| {
                if r.timestamp > now {
                    warn!(chain_id = %r.chain_id, timestamp = r.timestamp, now, "future-dated reading excluded from snapshot");
                    return false;
                }
                if r.timestamp < lower {
                    warn!(chain_id = %r.chain_id, age_secs = now - r.timestamp, "stale reading excluded from snapshot");
                    return false;
                }
                true
            })
            .collect();

        let Some(newest) = valid.iter().map(|r| r.timestamp).max() else {
            return Ok(NetworkSnapshot::empty(now));
        };

        let total: f64 = valid.iter().map(|r| r.value).sum();
        let age_secs = (now - newest).max(0);

        Ok(NetworkSnapshot {
            total_tps: round2(total),
            chain_count: valid.len() as u64,
            timestamp: newest,
            data_age: age_secs.div_euclid(SECS_PER_MINUTE),
            ..NetworkSnapshot::empty(now)
        })
    }

    /// One point per distinct stored timestamp in the last `days`, oldest first.
    /// Timestamps are grouped exactly; chains on different cadences do not merge.
    #[instrument(skip(self), fields(operation = "history"))]
    pub async fn history(&self, days: u32, now: i64) -> anyhow::Result<Vec<NetworkHistoryPoint>> {
        let cutoff = now - i64::from(days) * SECS_PER_DAY;
        let groups = self
            .store
            .sum_grouped_by_timestamp(&self.chain_ids, cutoff)
            .await?;

        Ok(groups
            .into_iter()
            .filter_map(|g| {
                let Some(date) = iso_date(g.timestamp) else {
                    warn!(timestamp = g.timestamp, "timestamp not representable as a date; skipped");
                    return None;
                };
                Some(NetworkHistoryPoint {
                    timestamp: g.timestamp,
                    total_tps: round2(g.total_value),
                    chain_count: g.chain_count,
                    date,
                })
            })
            .collect())
    }
}
