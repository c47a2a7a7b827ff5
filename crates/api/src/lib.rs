//! HTTP API for the order service.
//!
//! `POST /orders` checks inventory, takes payment and stores the order. Every
//! request is traced (W3C `traceparent` in and out), counted and timed, and
//! logged with its trace id.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use common::Meter;
use domain::InMemoryOrderStore;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{DownstreamClient, HttpDownstreamClient, OrderOrchestrator, services};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use config::Config;
use middleware::RequestMetrics;
use routes::orders::AppState;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "order-service";

/// Creates the Axum application router with all routes and shared state.
///
/// Layers, outermost first: trace correlation, request metrics, request/response
/// logging. All three wrap every route, `/metrics` and unmatched paths included.
pub fn create_app<C: DownstreamClient + 'static>(
    state: Arc<AppState<C>>,
    metrics_handle: PrometheusHandle,
    request_metrics: RequestMetrics,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<C>))
        .route("/orders/{id}", get(routes::orders::get::<C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|_request: &Request<Body>| tracing::Span::current())
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(axum::middleware::from_fn_with_state(
            request_metrics,
            middleware::track_metrics,
        ))
        .layer(axum::middleware::from_fn(middleware::correlate))
}

/// Creates application state calling the configured inventory and payment
/// services over HTTP.
pub fn create_state(
    config: &Config,
    meter: Meter,
) -> Result<Arc<AppState<HttpDownstreamClient>>, reqwest::Error> {
    let client = HttpDownstreamClient::builder()
        .service(services::inventory::SERVICE, config.inventory_url.as_str())
        .service(services::payment::SERVICE, config.payment_url.as_str())
        .timeout(config.downstream_timeout)
        .meter(meter.clone())
        .build()?;

    let orchestrator = OrderOrchestrator::new(client, InMemoryOrderStore::new(), meter);
    Ok(Arc::new(AppState::new(orchestrator)))
}
