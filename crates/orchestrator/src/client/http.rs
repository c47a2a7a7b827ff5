//! HTTP implementation of [`DownstreamClient`] backed by `reqwest`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{CorrelationContext, Meter};
use opentelemetry_http::HeaderInjector;
use reqwest::header::HeaderMap;
use tracing::Instrument;
use tracing::field::{Empty, display};

use super::{DownstreamClient, DownstreamRequest, DownstreamResponse};
use crate::error::DownstreamError;

/// Upper bound on a single outbound call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const REQUESTS_TOTAL: &str = "downstream_requests_total";
const REQUEST_DURATION: &str = "downstream_request_duration_seconds";

/// Calls downstream services over HTTP.
///
/// Each service name maps to a base URL; the request path is appended to it.
/// One shared connection pool, one attempt per call, bounded by the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct HttpDownstreamClient {
    http: reqwest::Client,
    endpoints: Arc<HashMap<String, String>>,
    meter: Meter,
}

impl HttpDownstreamClient {
    pub fn builder() -> HttpDownstreamClientBuilder {
        HttpDownstreamClientBuilder::default()
    }

    /// Base URL registered for `service`.
    pub fn endpoint(&self, service: &str) -> Option<&str> {
        self.endpoints.get(service).map(String::as_str)
    }

    async fn send(
        &self,
        request: DownstreamRequest,
        outbound: &CorrelationContext,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let service = request.service;
        let base = self
            .endpoints
            .get(&service)
            .ok_or_else(|| DownstreamError::Unreachable {
                service: service.clone(),
                reason: "no endpoint configured".to_string(),
            })?;
        let url = join_url(base, &request.path);

        let mut headers = HeaderMap::new();
        outbound.inject(&mut HeaderInjector(&mut headers));

        let mut builder = self
            .http
            .request(request.method, url.as_str())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(%url, "sending downstream request");
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "downstream call failed");
            DownstreamError::Unreachable {
                service: service.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        tracing::Span::current().record("status", status);

        let body = response
            .bytes()
            .await
            .map_err(|e| DownstreamError::Unreachable {
                service: service.clone(),
                reason: format!("failed reading response body: {e}"),
            })?;
        tracing::debug!(status, bytes = body.len(), "downstream response received");

        DownstreamResponse::new(status, body.to_vec()).error_for_status(&service)
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstreamClient {
    async fn call(
        &self,
        request: DownstreamRequest,
        ctx: &CorrelationContext,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let span = tracing::info_span!(
            "downstream_call",
            service = %request.service,
            method = %request.method,
            path = %request.path,
            trace_id = Empty,
            span_id = Empty,
            parent_span_id = Empty,
            status = Empty,
        );
        // The header carries the downstream_call span's own ids.
        let outbound = ctx.outbound(&span);
        span.record("trace_id", display(outbound.trace_id()));
        span.record("span_id", display(outbound.span_id()));
        if let Some(parent) = outbound.parent_span_id() {
            span.record("parent_span_id", display(parent));
        }

        let service = request.service.clone();
        let start = Instant::now();
        let result = self.send(request, &outbound).instrument(span).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(DownstreamError::Unreachable { .. }) => "unreachable",
            Err(DownstreamError::Rejected { .. }) => "rejected",
            Err(DownstreamError::Serialization { .. }) => "invalid_response",
        };
        self.meter
            .counter(
                REQUESTS_TOTAL,
                [("service", service.clone()), ("outcome", outcome.to_string())],
            )
            .increment(1);
        self.meter
            .histogram(REQUEST_DURATION, [("service", service)])
            .record(start.elapsed().as_secs_f64());

        result
    }
}

/// Configures an [`HttpDownstreamClient`].
#[derive(Debug)]
pub struct HttpDownstreamClientBuilder {
    endpoints: HashMap<String, String>,
    timeout: Duration,
    meter: Meter,
}

impl Default for HttpDownstreamClientBuilder {
    fn default() -> Self {
        Self {
            endpoints: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
            meter: Meter::noop(),
        }
    }
}

impl HttpDownstreamClientBuilder {
    /// Registers the base URL for a service name.
    pub fn service(mut self, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.endpoints.insert(name.into(), base_url.into());
        self
    }

    /// Bounds the total duration of each call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn meter(mut self, meter: Meter) -> Self {
        self.meter = meter;
        self
    }

    pub fn build(self) -> Result<HttpDownstreamClient, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        self.meter
            .describe_counter(REQUESTS_TOTAL, "Outbound calls by service and outcome.");
        self.meter
            .describe_histogram(REQUEST_DURATION, "Outbound call latency by service.");

        Ok(HttpDownstreamClient {
            http,
            endpoints: Arc::new(self.endpoints),
            meter: self.meter,
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) if !path.is_empty() => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
