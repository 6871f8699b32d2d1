//! Per-request span and HTTP metrics.
//!
//! Every request runs inside an `http_request` span. Requests carrying a W3C
//! `traceparent` header record the caller's trace and span ids on it.

use axum::{body::Body, extract::MatchedPath, http::Request, response::Response};
use relay_telemetry::{HistogramTimer, HTTP_REQUESTS, HTTP_REQUEST_DURATION};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        // Templated path keeps metric label cardinality bounded.
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| "unmatched".to_owned());

        let span = info_span!(
            "http_request",
            http.method = %req.method(),
            http.route = %route,
            http.target = %req.uri().path(),
            http.status_code = field::Empty,
            otel.kind = "server",
            otel.status_code = field::Empty,
            trace.parent_trace_id = field::Empty,
            trace.parent_span_id = field::Empty,
        );
        if let Some((trace_id, span_id)) = req
            .headers()
            .get("traceparent")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_traceparent)
        {
            span.record("trace.parent_trace_id", trace_id);
            span.record("trace.parent_span_id", span_id);
        }

        let recorder = span.clone();
        Box::pin(
            async move {
                let _timer =
                    HistogramTimer::new(&HTTP_REQUEST_DURATION.with_label_values(&[route.as_str()]));
                let result = inner.call(req).await;

                let status = match &result {
                    Ok(response) => {
                        let status = response.status();
                        recorder.record("http.status_code", status.as_u16());
                        recorder.record(
                            "otel.status_code",
                            if status.is_server_error() { "ERROR" } else { "OK" },
                        );
                        status.as_u16().to_string()
                    }
                    Err(_) => {
                        recorder.record("otel.status_code", "ERROR");
                        "error".to_string()
                    }
                };
                HTTP_REQUESTS.with_label_values(&[route.as_str(), status.as_str()]).inc();

                result
            }
            .instrument(span),
        )
    }
}

/// Split a `version-trace_id-parent_id-flags` header into trace and span id.
fn parse_traceparent(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.trim().split('-');
    let (_version, trace_id, span_id, _flags) =
        (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let is_hex = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit());
    if !is_hex(trace_id, 32) || !is_hex(span_id, 16) {
        return None;
    }
    if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
        return None;
    }
    Some((trace_id, span_id))
}
