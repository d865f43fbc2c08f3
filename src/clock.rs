// Time helpers shared by the pipeline. All timestamps are unix seconds.

use chrono::{DateTime, SecondsFormat, Utc};

pub const SECS_PER_MINUTE: i64 = 60;
pub const SECS_PER_DAY: i64 = 86_400;

pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// ISO-8601 UTC with milliseconds, e.g. 2024-01-01T00:00:00.000Z. None if out of chrono's range.
pub fn iso_date(timestamp: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
