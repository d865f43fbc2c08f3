// Domain models: provider points, persisted TPS records, derived network aggregates.

mod metric;
mod network;
mod tps;
mod update;

pub use metric::{MetricPoint, RawPoint};
pub use network::{DATA_AGE_UNIT, NetworkHistoryPoint, NetworkSnapshot, TimestampGroup};
pub use tps::{TpsRecord, UpsertSummary};
pub use update::{BatchReport, ChainRefresh, UpdateOutcome};
