// Application config (TOML). Path from CONFIG_FILE, default config.toml.

use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub refresh: RefreshConfig,
    pub chains: ChainsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    pub max_pool_size: u32,
}

fn default_db_path() -> String {
    "data/tps.db".into()
}

/// External metrics provider (GET {base_url}/chains/{id}/metrics/avgTps).
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub page_size: u32,
    #[serde(default = "default_time_interval")]
    pub time_interval: String,
}

fn default_time_interval() -> String {
    "day".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    pub max_attempts: u32,
    /// Linear backoff step: sleep attempt * step before the next attempt.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Chains updated in parallel inside one batch.
    pub concurrency: usize,
    #[serde(default)]
    pub on_startup: bool,
    /// Optional cron expression (UTC). When absent, batches only run on external trigger.
    #[serde(default)]
    pub schedule: Option<String>,
}

fn default_backoff_step_ms() -> u64 {
    2000
}

/// Chain catalog. Owned elsewhere; this service only reads it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainsConfig {
    pub ids: Vec<String>,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RefreshConfig {
    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            !self.provider.base_url.trim().is_empty(),
            "provider.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.provider.timeout_ms > 0,
            "provider.timeout_ms must be > 0, got {}",
            self.provider.timeout_ms
        );
        anyhow::ensure!(
            (1..=100).contains(&self.provider.page_size),
            "provider.page_size must be between 1 and 100, got {}",
            self.provider.page_size
        );
        anyhow::ensure!(
            self.refresh.max_attempts > 0,
            "refresh.max_attempts must be > 0, got {}",
            self.refresh.max_attempts
        );
        anyhow::ensure!(
            self.refresh.concurrency > 0,
            "refresh.concurrency must be > 0, got {}",
            self.refresh.concurrency
        );
        if let Some(ref expr) = self.refresh.schedule {
            cron::Schedule::from_str(expr).map_err(|e| {
                anyhow::anyhow!("refresh.schedule is not a valid cron expression: {}", e)
            })?;
        }
        anyhow::ensure!(!self.chains.ids.is_empty(), "chains.ids must be non-empty");
        let mut seen = HashSet::with_capacity(self.chains.ids.len());
        for id in &self.chains.ids {
            anyhow::ensure!(!id.trim().is_empty(), "chains.ids must not contain empty ids");
            anyhow::ensure!(seen.insert(id.as_str()), "chains.ids contains duplicate {}", id);
        }
        Ok(())
    }
}
