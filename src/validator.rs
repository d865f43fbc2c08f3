// Point validation: response shape check, numeric parsing, trailing 30-day window.

use thiserror::Error;

use crate::clock::SECS_PER_DAY;
use crate::models::{MetricPoint, RawPoint};

/// Ingestion window: points older than this (relative to `now`) are dropped.
pub const INGEST_WINDOW_SECS: i64 = 30 * SECS_PER_DAY;

/// The provider body did not carry a `results` list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response has no `results` field")]
    MissingResults,
    #[error("`results` is not a list")]
    ResultsNotList,
}

/// Pull the `results` list out of a provider body. Elements that are not objects
/// become empty points, which `filter_valid` then drops.
pub fn extract_points(body: &serde_json::Value) -> Result<Vec<RawPoint>, ShapeError> {
    let obj = body.as_object().ok_or(ShapeError::NotAnObject)?;
    let results = obj.get("results").ok_or(ShapeError::MissingResults)?;
    let items = results.as_array().ok_or(ShapeError::ResultsNotList)?;
    Ok(items
        .iter()
        .map(|item| match item.as_object() {
            Some(o) => RawPoint {
                timestamp: o.get("timestamp").cloned().unwrap_or_default(),
                value: o.get("value").cloned().unwrap_or_default(),
            },
            None => RawPoint::default(),
        })
        .collect())
}

/// Numbers and numeric strings are accepted; anything non-finite is not.
pub fn parse_number(v: &serde_json::Value) -> Option<f64> {
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Keep points with numeric fields and a timestamp in [now - 30d, now]. Input order is kept.
/// Never fails; rejected points are logged at debug and skipped.
pub fn filter_valid(raw: &[RawPoint], now: i64) -> Vec<MetricPoint> {
    let lower = now - INGEST_WINDOW_SECS;
    raw.iter()
        .filter_map(|p| {
            let (Some(ts), Some(value)) = (parse_number(&p.timestamp), parse_number(&p.value))
            else {
                tracing::debug!(
                    timestamp = %p.timestamp,
                    value = %p.value,
                    "dropping non-numeric point"
                );
                return None;
            };
            // Window is checked before truncation.
            if ts < lower as f64 || ts > now as f64 {
                tracing::debug!(timestamp = ts, now, "dropping out-of-window point");
                return None;
            }
            Some(MetricPoint {
                timestamp: ts.trunc() as i64,
                value,
            })
        })
        .collect()
}
