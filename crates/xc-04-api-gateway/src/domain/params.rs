//! Query-string parsing for the event routes.
//!
//! Parsing is lenient: a parameter that is empty or malformed is ignored and
//! its default applies. Only the wallet path segment can fail a request.

use chrono::{DateTime, Utc};
use shared_types::{Chain, ValueThreshold};
use std::collections::HashMap;
use tracing::debug;
use xc_01_event_store::{EventFilter, SortOrder};

use super::error::ApiError;

/// Build an [`EventFilter`] from raw query parameters.
pub fn filter_from_params(params: &HashMap<String, String>) -> EventFilter {
    let mut filter = EventFilter::default();

    if let Some(chain) = non_empty(params, "chain") {
        filter.chain = Some(Chain::parse(chain));
    }
    if let Some(token) = non_empty(params, "token") {
        filter.token_symbol = Some(token.to_string());
    }
    if let Some(from) = non_empty(params, "from") {
        filter.from = Some(from.to_string());
    }
    if let Some(to) = non_empty(params, "to") {
        filter.to = Some(to.to_string());
    }
    if let Some(raw) = non_empty(params, "min_value") {
        filter.min_value = ValueThreshold::parse(raw);
        if filter.min_value.is_none() {
            debug!(min_value = raw, "Ignoring malformed min_value");
        }
    }
    filter.start_time = non_empty(params, "start_time").and_then(|raw| rfc3339(raw, "start_time"));
    filter.end_time = non_empty(params, "end_time").and_then(|raw| rfc3339(raw, "end_time"));
    filter.order = sort_order(non_empty(params, "sort_by"), non_empty(params, "sort_order"));

    if let Some(limit) = non_empty(params, "limit").and_then(|raw| raw.parse::<usize>().ok()) {
        filter.limit = limit;
    }
    if let Some(offset) = non_empty(params, "offset").and_then(|raw| raw.parse::<usize>().ok()) {
        filter.offset = offset;
    }

    filter
}

/// Validate the `{address}` path segment.
pub fn wallet_address(raw: &str) -> Result<&str, ApiError> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(ApiError::bad_request("wallet address is required"));
    }
    Ok(address)
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn rfc3339(raw: &str, field: &'static str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            debug!(field, value = raw, error = %e, "Ignoring malformed timestamp");
            None
        }
    }
}

/// Ascending only when asked for explicitly on the timestamp ordering.
fn sort_order(sort_by: Option<&str>, sort_order: Option<&str>) -> SortOrder {
    let by_timestamp = sort_by.map_or(true, |s| s.eq_ignore_ascii_case("timestamp"));
    let ascending = sort_order.is_some_and(|s| s.eq_ignore_ascii_case("asc"));
    if by_timestamp && ascending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    }
}
