//! Health and event query handlers.

use crate::domain::error::ApiError;
use crate::domain::params::{filter_from_params, wallet_address};
use crate::router::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use shared_types::NormalizedEvent;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

/// `GET /transactions`
pub async fn recent_transactions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<NormalizedEvent>> {
    let filter = filter_from_params(&params);
    let events = state.store.get_recent(&filter).await;
    debug!(returned = events.len(), "Served recent transactions");
    Json(events)
}

/// `GET /wallet/:address/transactions`
pub async fn wallet_transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<NormalizedEvent>>, ApiError> {
    let address = wallet_address(&address)?;
    let filter = filter_from_params(&params);
    let events = state.store.get_by_address(address, &filter).await;
    debug!(address, returned = events.len(), "Served wallet transactions");
    Ok(Json(events))
}
