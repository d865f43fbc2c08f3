// Provider points: raw (as received) and validated.

use serde::{Deserialize, Serialize};

/// One entry of the provider's `results` list. Fields stay opaque until validated:
/// the provider sends numbers or numeric strings, and occasionally neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub timestamp: serde_json::Value,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl RawPoint {
    pub fn new(timestamp: impl Into<serde_json::Value>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: value.into(),
        }
    }
}

/// A validated in-window point. Not persisted as-is; see `TpsRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}
