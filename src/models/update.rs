// Terminal results of chain refreshes.

use serde::{Deserialize, Serialize};

use super::{TpsRecord, UpsertSummary};

/// Terminal state of one chain update. Serializes as {"status": "applied" | "no-data" | "failed", ...}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum UpdateOutcome {
    Applied { summary: UpsertSummary },
    NoData,
    Failed { attempts: u32, reason: String },
}

impl UpdateOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, UpdateOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpdateOutcome::Applied { .. } => "applied",
            UpdateOutcome::NoData => "no-data",
            UpdateOutcome::Failed { .. } => "failed",
        }
    }
}

/// Result of a single-chain refresh: the outcome plus the latest stored record after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRefresh {
    pub chain_id: String,
    pub outcome: UpdateOutcome,
    pub latest: Option<TpsRecord>,
}

/// Completion report of a batch refresh across the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub applied: Vec<String>,
    pub no_data: Vec<String>,
    pub failed: Vec<String>,
    pub started_at: i64,
    pub finished_at: i64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.applied.len() + self.no_data.len() + self.failed.len()
    }

    pub(crate) fn record(&mut self, chain_id: String, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Applied { .. } => self.applied.push(chain_id),
            UpdateOutcome::NoData => self.no_data.push(chain_id),
            UpdateOutcome::Failed { .. } => self.failed.push(chain_id),
        }
    }
}
