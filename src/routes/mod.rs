// HTTP surface for the refresh/aggregation boundary. No auth or CORS here.

mod api;
mod error;
mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::refresh_worker::RefreshWorker;
use crate::updater::Updater;

pub use error::ApiError;

/// Upper bound for `days` query parameters.
pub const MAX_QUERY_DAYS: u32 = 90;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) updater: Arc<Updater>,
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) refresh_worker: Arc<RefreshWorker>,
    pub(crate) catalog: Arc<HashSet<String>>,
}

impl AppState {
    pub(crate) fn known_chain(&self, chain_id: &str) -> Result<(), ApiError> {
        if self.catalog.contains(chain_id) {
            Ok(())
        } else {
            Err(ApiError::UnknownChain(chain_id.to_string()))
        }
    }
}

pub fn app(
    updater: Arc<Updater>,
    aggregator: Arc<Aggregator>,
    refresh_worker: Arc<RefreshWorker>,
) -> Router {
    let catalog = Arc::new(aggregator.chain_ids().iter().cloned().collect());
    let state = AppState {
        updater,
        aggregator,
        refresh_worker,
        catalog,
    };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/health", get(http::health_handler)) // GET /health
        .route("/api/refresh", post(api::refresh_all)) // POST /api/refresh
        .route("/api/network/snapshot", get(api::network_snapshot)) // GET /api/network/snapshot
        .route("/api/network/history", get(api::network_history)) // GET /api/network/history?days=N
        .route("/api/chains/{chain_id}/refresh", post(api::refresh_chain)) // POST /api/chains/{id}/refresh
        .route("/api/chains/{chain_id}/history", get(api::chain_history)) // GET /api/chains/{id}/history?days=N
        .route("/api/chains/{chain_id}/latest", get(api::chain_latest)) // GET /api/chains/{id}/latest
        .with_state(state)
}
