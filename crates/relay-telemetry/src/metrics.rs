//! Prometheus metrics for the relay.
//!
//! All metrics follow the naming convention: `relay_<component>_<metric>`
//!
//! Component state (store, hub, ingestor) keeps its own counters; the
//! gauges below mirror those snapshots at scrape time. HTTP metrics are
//! recorded directly by the gateway middleware.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT STORE
    // =========================================================================

    /// Events currently held in the in-memory cache
    pub static ref STORE_CACHED_EVENTS: IntGauge = IntGauge::new(
        "relay_store_cached_events",
        "Events currently held in the in-memory cache"
    ).expect("metric creation failed");

    /// Addresses with a per-address index entry
    pub static ref STORE_INDEXED_ADDRESSES: IntGauge = IntGauge::new(
        "relay_store_indexed_addresses",
        "Addresses currently present in the per-address index"
    ).expect("metric creation failed");

    /// Cumulative store operations by outcome
    pub static ref STORE_OPERATIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("relay_store_operations", "Cumulative store operations by outcome"),
        &["outcome"]  // inserted/duplicate/rejected/durable_failure/durable_fallback
    ).expect("metric creation failed");

    // =========================================================================
    // FAN-OUT HUB
    // =========================================================================

    /// Live stream subscribers
    pub static ref HUB_SUBSCRIBERS: IntGauge = IntGauge::new(
        "relay_hub_subscribers",
        "Currently registered live-stream subscribers"
    ).expect("metric creation failed");

    /// Cumulative hub activity by kind
    pub static ref HUB_MESSAGES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("relay_hub_messages", "Cumulative fan-out activity"),
        &["kind"]  // broadcast/delivered/dropped_slow
    ).expect("metric creation failed");

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Cumulative transport messages by outcome
    pub static ref INGEST_MESSAGES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("relay_ingest_messages", "Cumulative transport messages by outcome"),
        &["outcome"]  // received/stored/duplicate/rejected
    ).expect("metric creation failed");

    /// Cumulative transport subscribe attempts by outcome
    pub static ref INGEST_SUBSCRIPTIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("relay_ingest_subscriptions", "Cumulative transport subscribe attempts"),
        &["outcome"]  // ok/failed
    ).expect("metric creation failed");

    // =========================================================================
    // HTTP
    // =========================================================================

    /// HTTP requests by route and status class
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("relay_http_requests_total", "HTTP requests served"),
        &["route", "status"]
    ).expect("metric creation failed");

    /// HTTP request latency
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "relay_http_request_duration_seconds",
            "Time spent producing HTTP responses"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("bucket layout is valid")),
        &["route"]
    ).expect("metric creation failed");
}

/// Handle proving the relay metrics are registered.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Store
        Box::new(STORE_CACHED_EVENTS.clone()),
        Box::new(STORE_INDEXED_ADDRESSES.clone()),
        Box::new(STORE_OPERATIONS.clone()),
        // Hub
        Box::new(HUB_SUBSCRIBERS.clone()),
        Box::new(HUB_MESSAGES.clone()),
        // Ingestion
        Box::new(INGEST_MESSAGES.clone()),
        Box::new(INGEST_SUBSCRIPTIONS.clone()),
        // HTTP
        Box::new(HTTP_REQUESTS.clone()),
        Box::new(HTTP_REQUEST_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Set a cumulative count mirrored from a component snapshot.
pub fn set_count(gauge: &IntGaugeVec, label: &str, value: u64) {
    gauge
        .with_label_values(&[label])
        .set(i64::try_from(value).unwrap_or(i64::MAX));
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice_is_ok() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_set_count_saturates() {
        set_count(&STORE_OPERATIONS, "inserted", 12);
        assert_eq!(STORE_OPERATIONS.with_label_values(&["inserted"]).get(), 12);

        set_count(&STORE_OPERATIONS, "rejected", u64::MAX);
        assert_eq!(
            STORE_OPERATIONS.with_label_values(&["rejected"]).get(),
            i64::MAX
        );
    }

    #[test]
    fn test_encode_contains_registered_families() {
        register_metrics().unwrap();
        HUB_SUBSCRIBERS.set(3);
        let text = encode_metrics().unwrap();
        assert!(text.contains("relay_hub_subscribers 3"));
    }

    #[test]
    fn test_histogram_timer_observes_on_drop() {
        let histogram = HTTP_REQUEST_DURATION.with_label_values(&["test"]);
        let before = histogram.get_sample_count();
        drop(HistogramTimer::new(&histogram));
        assert_eq!(histogram.get_sample_count(), before + 1);
    }
}
