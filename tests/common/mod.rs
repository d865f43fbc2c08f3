// Shared test helpers: temp stores, scripted provider stubs, response bodies.
#![allow(dead_code)]

use async_trait::async_trait;
use chaintps::clock::SECS_PER_DAY;
use chaintps::metrics_client::{FetchError, MetricsSource};
use chaintps::models::{TimestampGroup, TpsRecord, UpsertSummary};
use chaintps::tps_repo::{SeriesStore, TpsRepo};
use chaintps::updater::UpdaterConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_CONFIG: &str = r#"
[server]
port = 8080
host = "127.0.0.1"

[database]
path = "data/test.db"
max_pool_size = 2

[provider]
base_url = "http://127.0.0.1:9"
timeout_ms = 1000
page_size = 30

[refresh]
max_attempts = 3
backoff_step_ms = 1
concurrency = 2

[chains]
ids = ["43114", "1234", "5678"]
"#;

/// Temp-file SQLite repo; keep the TempDir alive for the test's duration.
pub async fn temp_repo() -> (TempDir, TpsRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tps.db");
    let repo = TpsRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

pub fn fast_config(max_attempts: u32) -> UpdaterConfig {
    UpdaterConfig {
        max_attempts,
        backoff_step: Duration::from_millis(1),
    }
}

pub fn record(chain_id: &str, timestamp: i64, value: f64) -> TpsRecord {
    TpsRecord {
        chain_id: chain_id.into(),
        timestamp,
        value,
        last_updated: timestamp,
    }
}

/// `{ "results": [ {timestamp, value}, ... ] }`
pub fn results_body(points: &[(i64, f64)]) -> serde_json::Value {
    serde_json::json!({
        "results": points
            .iter()
            .map(|(t, v)| serde_json::json!({ "timestamp": t, "value": v }))
            .collect::<Vec<_>>()
    })
}

/// Points a few minutes old, inside every window.
pub fn recent_body(now: i64) -> serde_json::Value {
    results_body(&[(now - 600, 4.25), (now - SECS_PER_DAY, 3.0)])
}

#[derive(Clone)]
pub enum Step {
    Body(serde_json::Value),
    Fail,
}

/// Plays its steps in order; the last step repeats once the script runs out.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn fetch_metrics(&self, _chain_id: &str) -> Result<serde_json::Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let next = self.steps.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(s) = next {
                *last = Some(s);
            }
            last.clone()
        };
        match step {
            Some(Step::Body(b)) => Ok(b),
            Some(Step::Fail) | None => Err(FetchError::Status(503)),
        }
    }
}

/// Fixed response per chain id, optionally delayed. Unknown chains fail.
pub struct ChainMapSource {
    responses: HashMap<String, Step>,
    delay: Duration,
    calls: AtomicU32,
}

impl ChainMapSource {
    pub fn new(responses: Vec<(&str, Step)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(id, s)| (id.to_string(), s))
                .collect(),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for ChainMapSource {
    async fn fetch_metrics(&self, chain_id: &str) -> Result<serde_json::Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.responses.get(chain_id) {
            Some(Step::Body(b)) => Ok(b.clone()),
            _ => Err(FetchError::Request(format!("no route to chain {}", chain_id))),
        }
    }
}

/// Store whose every record write fails; reads are empty.
pub struct RejectingStore;

#[async_trait]
impl SeriesStore for RejectingStore {
    async fn upsert_many(&self, records: &[TpsRecord]) -> anyhow::Result<UpsertSummary> {
        Ok(UpsertSummary {
            failed: records.len() as u64,
            ..Default::default()
        })
    }

    async fn count_for_chain(&self, _chain_id: &str) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn latest_for_chain(&self, _chain_id: &str) -> anyhow::Result<Option<TpsRecord>> {
        Ok(None)
    }

    async fn find_since(&self, _chain_id: &str, _cutoff: i64) -> anyhow::Result<Vec<TpsRecord>> {
        Ok(vec![])
    }

    async fn latest_for_chain_within_window(
        &self,
        _chain_id: &str,
        _lower: i64,
        _upper: i64,
    ) -> anyhow::Result<Option<TpsRecord>> {
        Ok(None)
    }

    async fn sum_grouped_by_timestamp(
        &self,
        _chain_ids: &[String],
        _cutoff: i64,
    ) -> anyhow::Result<Vec<TimestampGroup>> {
        Ok(vec![])
    }
}
