//! Logging, trace export and metrics setup.

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::logs::LoggerProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{Resource, runtime};
use thiserror::Error;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use common::Meter;

use crate::config::{Config, LogFormat};

/// Latency buckets (seconds) for every `*_duration_seconds` histogram.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const TRACES_PATH: &str = "/v1/traces";
const LOGS_PATH: &str = "/v1/logs";

/// Targets kept out of the log export pipeline, which runs on these crates.
const EXPORT_SILENCED_TARGETS: &[&str] = &["hyper", "h2", "reqwest", "opentelemetry"];

/// Errors raised while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP {signal} exporter: {reason}")]
    Exporter { signal: &'static str, reason: String },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Owns the trace and log pipelines.
///
/// [`shutdown`](Self::shutdown) flushes whatever the batch processors still
/// hold; call it once the server has stopped.
pub struct Telemetry {
    tracer_provider: TracerProvider,
    logger_provider: Option<LoggerProvider>,
}

impl Telemetry {
    /// Flushes and stops the exporters. Blocks until the export finishes.
    pub fn shutdown(self) {
        if let Err(error) = self.tracer_provider.shutdown() {
            tracing::warn!(%error, "trace provider shutdown failed");
        }
        if let Some(provider) = self.logger_provider
            && let Err(error) = provider.shutdown()
        {
            tracing::warn!(%error, "log provider shutdown failed");
        }
    }
}

/// Resource attributes identifying this service on every exported span and log.
pub fn resource() -> Resource {
    Resource::new([
        KeyValue::new("service.name", crate::SERVICE_NAME),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ])
}

/// Installs the W3C propagator and the global tracing subscriber.
///
/// Spans always go through the OpenTelemetry layer, so their ids are the ids
/// propagated downstream. With an OTLP endpoint configured, spans and log
/// events are batched and exported over OTLP/HTTP; without one they stay in
/// process. In JSON mode each log line includes the current span and its
/// parents, which carry the request's `trace_id` and `span_id`.
pub fn init_telemetry(config: &Config) -> Result<Telemetry, TelemetryError> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let mut tracer_builder = TracerProvider::builder().with_resource(resource());
    let mut logger_provider = None;

    if let Some(endpoint) = &config.otlp_endpoint {
        let spans = SpanExporter::builder()
            .with_http()
            .with_http_client(reqwest::Client::new())
            .with_endpoint(format!("{endpoint}{TRACES_PATH}"))
            .build()
            .map_err(|e| TelemetryError::Exporter {
                signal: "trace",
                reason: e.to_string(),
            })?;
        tracer_builder = tracer_builder.with_batch_exporter(spans, runtime::Tokio);

        let logs = LogExporter::builder()
            .with_http()
            .with_http_client(reqwest::Client::new())
            .with_endpoint(format!("{endpoint}{LOGS_PATH}"))
            .build()
            .map_err(|e| TelemetryError::Exporter {
                signal: "log",
                reason: e.to_string(),
            })?;
        logger_provider = Some(
            LoggerProvider::builder()
                .with_resource(resource())
                .with_batch_exporter(logs, runtime::Tokio)
                .build(),
        );
    }

    let tracer_provider = tracer_builder.build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };
    let log_bridge = logger_provider.as_ref().map(|provider| {
        OpenTelemetryTracingBridge::new(provider).with_filter(filter_fn(|meta| {
            !EXPORT_SILENCED_TARGETS
                .iter()
                .any(|target| meta.target().starts_with(target))
        }))
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer(crate::SERVICE_NAME)),
        )
        .with(log_bridge)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    tracing::info!(
        otlp_endpoint = config.otlp_endpoint.as_deref().unwrap_or("disabled"),
        "telemetry initialized"
    );

    Ok(Telemetry {
        tracer_provider,
        logger_provider,
    })
}

/// Builds a Prometheus recorder without installing it globally.
///
/// The returned [`Meter`] is handed to the components that emit metrics; the
/// handle renders the current state for `GET /metrics`.
pub fn prometheus_meter() -> Result<(Meter, PrometheusHandle), BuildError> {
    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .build_recorder();
    let handle = recorder.handle();
    Ok((Meter::new(recorder), handle))
}
