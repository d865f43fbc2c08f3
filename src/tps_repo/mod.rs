// SQLite TPS series. One row per (chain_id, timestamp); writes are upserts on that key.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use crate::models::{TimestampGroup, TpsRecord, UpsertSummary};

/// Keyed time-series store the updater writes and the aggregator reads.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Unordered bulk upsert: each record is applied on its own, so one failure
    /// does not stop the rest. Only a store-wide failure is an `Err`.
    async fn upsert_many(&self, records: &[TpsRecord]) -> anyhow::Result<UpsertSummary>;

    async fn count_for_chain(&self, chain_id: &str) -> anyhow::Result<u64>;

    async fn latest_for_chain(&self, chain_id: &str) -> anyhow::Result<Option<TpsRecord>>;

    /// Records with timestamp >= cutoff, newest first.
    async fn find_since(&self, chain_id: &str, cutoff: i64) -> anyhow::Result<Vec<TpsRecord>>;

    /// Newest record with lower <= timestamp <= upper.
    async fn latest_for_chain_within_window(
        &self,
        chain_id: &str,
        lower: i64,
        upper: i64,
    ) -> anyhow::Result<Option<TpsRecord>>;

    /// Sum and count of values per distinct timestamp >= cutoff over the given chains, oldest first.
    async fn sum_grouped_by_timestamp(
        &self,
        chain_ids: &[String],
        cutoff: i64,
    ) -> anyhow::Result<Vec<TimestampGroup>>;
}

pub struct TpsRepo {
    pool: SqlitePool,
}

enum WriteKind {
    Inserted,
    Unchanged,
    Modified,
}

impl TpsRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tps_records (
                chain_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                value REAL NOT NULL,
                last_updated INTEGER NOT NULL,
                PRIMARY KEY (chain_id, timestamp)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tps_timestamp ON tps_records(timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// One transaction per record. The INSERT runs first so the write lock is held
    /// before the existing value is read.
    async fn upsert_one(&self, r: &TpsRecord) -> anyhow::Result<WriteKind> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO tps_records (chain_id, timestamp, value, last_updated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(chain_id, timestamp) DO NOTHING
            "#,
        )
        .bind(&r.chain_id)
        .bind(r.timestamp)
        .bind(r.value)
        .bind(r.last_updated)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted > 0 {
            tx.commit().await?;
            return Ok(WriteKind::Inserted);
        }

        let existing = sqlx::query_scalar::<_, f64>(
            "SELECT value FROM tps_records WHERE chain_id = $1 AND timestamp = $2",
        )
        .bind(&r.chain_id)
        .bind(r.timestamp)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE tps_records SET value = $1, last_updated = $2 WHERE chain_id = $3 AND timestamp = $4",
        )
        .bind(r.value)
        .bind(r.last_updated)
        .bind(&r.chain_id)
        .bind(r.timestamp)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(if existing == r.value {
            WriteKind::Unchanged
        } else {
            WriteKind::Modified
        })
    }

    fn parse_record(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<TpsRecord> {
        Ok(TpsRecord {
            chain_id: row.try_get("chain_id")?,
            timestamp: row.try_get("timestamp")?,
            value: row.try_get("value")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

#[async_trait]
impl SeriesStore for TpsRepo {
    #[instrument(skip(self, records), fields(repo = "tps", operation = "upsert_many", records_count = records.len()))]
    async fn upsert_many(&self, records: &[TpsRecord]) -> anyhow::Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for r in records {
            match self.upsert_one(r).await {
                Ok(WriteKind::Inserted) => summary.upserted += 1,
                Ok(WriteKind::Unchanged) => summary.matched += 1,
                Ok(WriteKind::Modified) => {
                    summary.matched += 1;
                    summary.modified += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        chain_id = %r.chain_id,
                        timestamp = r.timestamp,
                        "record upsert failed"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    #[instrument(skip(self), fields(repo = "tps", operation = "count_for_chain"))]
    async fn count_for_chain(&self, chain_id: &str) -> anyhow::Result<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tps_records WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    #[instrument(skip(self), fields(repo = "tps", operation = "latest_for_chain"))]
    async fn latest_for_chain(&self, chain_id: &str) -> anyhow::Result<Option<TpsRecord>> {
        let row = sqlx::query(
            "SELECT chain_id, timestamp, value, last_updated FROM tps_records
             WHERE chain_id = $1 ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(chain_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_record).transpose()
    }

    #[instrument(skip(self), fields(repo = "tps", operation = "find_since"))]
    async fn find_since(&self, chain_id: &str, cutoff: i64) -> anyhow::Result<Vec<TpsRecord>> {
        let rows = sqlx::query(
            "SELECT chain_id, timestamp, value, last_updated FROM tps_records
             WHERE chain_id = $1 AND timestamp >= $2 ORDER BY timestamp DESC",
        )
        .bind(chain_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_record).collect()
    }

    #[instrument(skip(self), fields(repo = "tps", operation = "latest_for_chain_within_window"))]
    async fn latest_for_chain_within_window(
        &self,
        chain_id: &str,
        lower: i64,
        upper: i64,
    ) -> anyhow::Result<Option<TpsRecord>> {
        let row = sqlx::query(
            "SELECT chain_id, timestamp, value, last_updated FROM tps_records
             WHERE chain_id = $1 AND timestamp >= $2 AND timestamp <= $3
             ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(chain_id)
        .bind(lower)
        .bind(upper)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_record).transpose()
    }

    #[instrument(skip(self, chain_ids), fields(repo = "tps", operation = "sum_grouped_by_timestamp", chains_count = chain_ids.len()))]
    async fn sum_grouped_by_timestamp(
        &self,
        chain_ids: &[String],
        cutoff: i64,
    ) -> anyhow::Result<Vec<TimestampGroup>> {
        if chain_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT timestamp, SUM(value) AS total_value, COUNT(*) AS chain_count
             FROM tps_records WHERE timestamp >= ",
        );
        qb.push_bind(cutoff);
        qb.push(" AND chain_id IN (");
        let mut ids = qb.separated(", ");
        for id in chain_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") GROUP BY timestamp ORDER BY timestamp ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let chain_count: i64 = row.try_get("chain_count")?;
            out.push(TimestampGroup {
                timestamp: row.try_get("timestamp")?,
                total_value: row.try_get("total_value")?,
                chain_count: chain_count.max(0) as u64,
            });
        }
        Ok(out)
    }
}
