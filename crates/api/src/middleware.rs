//! Per-request middleware: trace correlation and request metrics.

use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use common::{CorrelationContext, Meter, TRACEPARENT_HEADER};
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use tracing::Instrument;
use tracing::field::{Empty, display};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

/// Path label for requests no route matched. Keeps the label set bounded.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Resolves the request's [`CorrelationContext`] and runs the rest of the
/// stack inside an `http_request` span carrying its ids.
///
/// A valid inbound `traceparent` becomes the span's parent; otherwise the
/// span starts a new trace. The context is stored in the request extensions
/// for handlers and echoed back in the response `traceparent` header.
pub async fn correlate(mut req: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        route = Empty,
        trace_id = Empty,
        span_id = Empty,
        parent_span_id = Empty,
        status_code = Empty,
    );

    let ctx = match inbound_parent(req.headers()) {
        Some(remote) => remote.join(&span),
        None => CorrelationContext::of_span(&span).unwrap_or_else(CorrelationContext::new_root),
    };
    span.record("trace_id", display(ctx.trace_id()));
    span.record("span_id", display(ctx.span_id()));
    if let Some(parent) = ctx.parent_span_id() {
        span.record("parent_span_id", display(parent));
    }

    req.extensions_mut().insert(ctx.clone());
    let mut response = next.run(req).instrument(span).await;

    ctx.inject(&mut HeaderInjector(response.headers_mut()));
    response
}

fn inbound_parent(headers: &HeaderMap) -> Option<CorrelationContext> {
    let parent = CorrelationContext::extract(&HeaderExtractor(headers));
    if parent.is_none() && headers.contains_key(TRACEPARENT_HEADER) {
        tracing::debug!("ignoring invalid traceparent header");
    }
    parent
}

/// Request counter and latency histogram sharing one label set.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    meter: Meter,
}

impl RequestMetrics {
    pub fn new(meter: Meter) -> Self {
        meter.describe_counter(REQUESTS_TOTAL, "Total number of HTTP requests.");
        meter.describe_histogram(REQUEST_DURATION, "HTTP request latency distribution.");
        Self { meter }
    }

    /// Records one completed request: one latency sample and one count,
    /// both labeled `method`, `path`, `status_code`.
    pub fn record(&self, method: &str, path: &str, status: u16, latency: Duration) {
        let labels = [
            ("method", method.to_string()),
            ("path", path.to_string()),
            ("status_code", status.to_string()),
        ];
        self.meter
            .histogram(REQUEST_DURATION, labels.clone())
            .record(latency.as_secs_f64());
        self.meter.counter(REQUESTS_TOTAL, labels).increment(1);
    }
}

/// Measures every request and records it once the response status is final.
///
/// The path label is the matched route template (`/orders/{id}`), or
/// [`UNMATCHED_PATH`] when no route matched. The `route` and `status_code`
/// labels are also recorded on the enclosing `http_request` span, which
/// carries the trace id into the exported trace.
pub async fn track_metrics(
    State(metrics): State<RequestMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let trace_id = req
        .extensions()
        .get::<CorrelationContext>()
        .map(|ctx| ctx.trace_id().to_string())
        .unwrap_or_default();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency = start.elapsed();
    metrics.record(&method, &path, status, latency);

    let span = tracing::Span::current();
    span.record("route", path.as_str());
    span.record("status_code", status);
    tracing::debug!(
        %method,
        %path,
        status,
        %trace_id,
        latency_ms = latency.as_millis() as u64,
        "request metrics recorded"
    );

    response
}
