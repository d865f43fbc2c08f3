// Pipeline handlers: refresh triggers, network aggregates, per-chain reads.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::{AppState, MAX_QUERY_DAYS};
use super::error::ApiError;
use crate::aggregator::DEFAULT_NETWORK_HISTORY_DAYS;
use crate::clock;
use crate::updater::DEFAULT_HISTORY_DAYS;

#[derive(Debug, Deserialize)]
pub(super) struct DaysQuery {
    days: Option<u32>,
}

impl DaysQuery {
    fn days_or(&self, default: u32) -> Result<u32, ApiError> {
        let days = self.days.unwrap_or(default);
        if (1..=MAX_QUERY_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(ApiError::BadRequest(format!(
                "days must be between 1 and {}, got {}",
                MAX_QUERY_DAYS, days
            )))
        }
    }
}

/// POST /api/refresh — starts a batch over the catalog and returns 202 without waiting.
pub(super) async fn refresh_all(State(state): State<AppState>) -> impl IntoResponse {
    let already_running = match state.refresh_worker.trigger() {
        Some(handle) => {
            handle.detach();
            false
        }
        None => true,
    };
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "accepted": true,
            "chains": state.refresh_worker.chain_count(),
            "alreadyRunning": already_running,
        })),
    )
}

/// POST /api/chains/{chain_id}/refresh — 200 with the latest record, 502 once retries are exhausted.
pub(super) async fn refresh_chain(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
) -> Result<Response, ApiError> {
    state.known_chain(&chain_id)?;
    let result = state.updater.refresh_chain(&chain_id).await;
    let status = if result.outcome.is_failed() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)).into_response())
}

pub(super) async fn network_snapshot(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.aggregator.network_snapshot(clock::now_secs()).await?;
    Ok(Json(snapshot).into_response())
}

pub(super) async fn network_history(
    State(state): State<AppState>,
    Query(q): Query<DaysQuery>,
) -> Result<Response, ApiError> {
    let days = q.days_or(DEFAULT_NETWORK_HISTORY_DAYS)?;
    let points = state.aggregator.history(days, clock::now_secs()).await?;
    Ok(Json(points).into_response())
}

/// GET /api/chains/{chain_id}/history — fills from the provider first when nothing is stored.
pub(super) async fn chain_history(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
    Query(q): Query<DaysQuery>,
) -> Result<Response, ApiError> {
    state.known_chain(&chain_id)?;
    let days = q.days_or(DEFAULT_HISTORY_DAYS)?;
    let records = state.updater.get_history(&chain_id, days).await?;
    Ok(Json(records).into_response())
}

pub(super) async fn chain_latest(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
) -> Result<Response, ApiError> {
    state.known_chain(&chain_id)?;
    match state.updater.get_latest(&chain_id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::NoData(chain_id)),
    }
}
