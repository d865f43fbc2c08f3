// Network-wide aggregates. Derived on every call, never stored.

use serde::{Deserialize, Serialize};

pub const DATA_AGE_UNIT: &str = "minutes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub total_tps: f64,
    pub chain_count: u64,
    /// Most recent reading among contributing chains (not wall-clock time).
    pub timestamp: i64,
    pub data_age: i64,
    pub data_age_unit: String,
}

impl NetworkSnapshot {
    pub fn empty(now: i64) -> Self {
        Self {
            total_tps: 0.0,
            chain_count: 0,
            timestamp: now,
            data_age: 0,
            data_age_unit: DATA_AGE_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHistoryPoint {
    pub timestamp: i64,
    pub total_tps: f64,
    pub chain_count: u64,
    pub date: String,
}

/// Store-side rollup row: one per distinct timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampGroup {
    pub timestamp: i64,
    pub total_value: f64,
    pub chain_count: u64,
}
