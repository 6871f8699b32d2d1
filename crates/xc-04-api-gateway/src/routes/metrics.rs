//! `GET /metrics`: Prometheus text exposition.
//!
//! Component counters live with their components; this handler copies a
//! fresh snapshot of each into the relay gauges right before encoding.

use crate::domain::error::ApiError;
use crate::router::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use relay_telemetry::{
    encode_metrics, set_count, HUB_MESSAGES, HUB_SUBSCRIBERS, INGEST_MESSAGES,
    INGEST_SUBSCRIPTIONS, STORE_CACHED_EVENTS, STORE_INDEXED_ADDRESSES, STORE_OPERATIONS,
};
use tracing::warn;
use xc_01_event_store::StoreStats;
use xc_02_fanout_hub::HubStats;
use xc_03_event_ingestion::IngestStats;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    record_store(&state.store.stats());

    match state.hub.stats().await {
        Ok(stats) => record_hub(&stats),
        Err(e) => warn!(error = %e, "Hub stats unavailable"),
    }

    if let Some(ingestor) = &state.ingestor {
        record_ingest(&ingestor.stats());
    }

    let body = encode_metrics().map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}

fn gauge(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn record_store(stats: &StoreStats) {
    STORE_CACHED_EVENTS.set(gauge(stats.cached_events));
    STORE_INDEXED_ADDRESSES.set(gauge(stats.indexed_addresses));
    set_count(&STORE_OPERATIONS, "inserted", stats.inserted);
    set_count(&STORE_OPERATIONS, "duplicate", stats.duplicates);
    set_count(&STORE_OPERATIONS, "rejected", stats.rejected);
    set_count(&STORE_OPERATIONS, "durable_failure", stats.durable_failures);
    set_count(&STORE_OPERATIONS, "durable_fallback", stats.durable_fallbacks);
}

fn record_hub(stats: &HubStats) {
    HUB_SUBSCRIBERS.set(gauge(stats.subscribers));
    set_count(&HUB_MESSAGES, "broadcast", stats.broadcasts);
    set_count(&HUB_MESSAGES, "delivered", stats.delivered);
    set_count(&HUB_MESSAGES, "dropped_slow", stats.dropped_slow);
}

fn record_ingest(stats: &IngestStats) {
    set_count(&INGEST_MESSAGES, "received", stats.received);
    set_count(&INGEST_MESSAGES, "stored", stats.stored);
    set_count(&INGEST_MESSAGES, "duplicate", stats.duplicates);
    set_count(&INGEST_MESSAGES, "rejected", stats.rejected);
    set_count(&INGEST_SUBSCRIPTIONS, "ok", stats.subscriptions);
    set_count(&INGEST_SUBSCRIPTIONS, "failed", stats.subscribe_failures);
}
