use anyhow::Result;
use chaintps::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let repo = Arc::new(
        tps_repo::TpsRepo::connect(&app_config.database.path, app_config.database.max_pool_size)
            .await?,
    );
    repo.init().await?;
    let store: Arc<dyn tps_repo::SeriesStore> = repo;

    let source: Arc<dyn metrics_client::MetricsSource> =
        Arc::new(metrics_client::HttpMetricsClient::new(&app_config.provider)?);
    let updater = Arc::new(updater::Updater::new(
        source,
        store.clone(),
        updater::UpdaterConfig::from(&app_config.refresh),
    ));
    let aggregator = Arc::new(aggregator::Aggregator::new(
        store,
        app_config.chains.ids.clone(),
    ));
    let refresh_worker = Arc::new(refresh_worker::RefreshWorker::new(
        updater.clone(),
        app_config.chains.ids.clone(),
        app_config.refresh.concurrency,
    ));

    if app_config.refresh.on_startup {
        refresh_worker::run_startup_refresh(&refresh_worker).await?;
    }
    let schedule_handle = app_config
        .refresh
        .schedule
        .clone()
        .map(|expr| refresh_worker::spawn_schedule(refresh_worker.clone(), expr));

    let app = routes::app(updater, aggregator, refresh_worker);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        chains = app_config.chains.ids.len(),
        scheduled = schedule_handle.is_some(),
        "Listening on http://{}",
        addr
    );

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            if let Some(handle) = schedule_handle {
                handle.abort();
            }
        }
    }

    Ok(())
}
