// Persisted series row and bulk-write accounting.

use serde::{Deserialize, Serialize};

use super::MetricPoint;

/// One stored TPS reading. Unique per (chain_id, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TpsRecord {
    pub chain_id: String,
    pub timestamp: i64,
    pub value: f64,
    pub last_updated: i64,
}

impl TpsRecord {
    pub fn from_point(chain_id: &str, point: MetricPoint, last_updated: i64) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            timestamp: point.timestamp,
            value: point.value,
            last_updated,
        }
    }
}

/// Outcome of an unordered bulk upsert. Records are applied independently,
/// so `failed > 0` means partial application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSummary {
    /// Records that hit an existing (chain_id, timestamp) row.
    pub matched: u64,
    /// Matched records whose stored value changed.
    pub modified: u64,
    /// Records that created a new row.
    pub upserted: u64,
    pub failed: u64,
}

impl UpsertSummary {
    pub fn applied(&self) -> u64 {
        self.matched + self.upserted
    }
}
