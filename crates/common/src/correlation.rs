//! Request-scoped correlation context in W3C Trace Context form.
//!
//! A [`CorrelationContext`] is the OpenTelemetry [`SpanContext`] of the span
//! doing the work. When the `tracing-opentelemetry` layer is installed the
//! ids are the ids of the `tracing` span itself, so the exported span, the
//! propagated `traceparent` header and the log lines all agree. Without the
//! layer (unit tests, filtered-out spans) ids are generated with the SDK's
//! random id generator and propagation still works.

use std::collections::HashMap;
use std::fmt;

use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, TraceContextExt, TraceFlags, TraceState};
pub use opentelemetry::trace::{SpanId, TraceId};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};
use thiserror::Error;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name used to carry the context between services.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Errors produced when parsing a `traceparent` header value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceparentError {
    #[error("invalid traceparent value: {0:?}")]
    Invalid(String),
}

/// Trace and span identity of the current unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    span_context: SpanContext,
    parent_span_id: Option<SpanId>,
}

impl CorrelationContext {
    /// Starts a new, sampled trace.
    pub fn new_root() -> Self {
        let ids = RandomIdGenerator::default();
        Self {
            span_context: SpanContext::new(
                ids.new_trace_id(),
                ids.new_span_id(),
                TraceFlags::SAMPLED,
                false,
                TraceState::default(),
            ),
            parent_span_id: None,
        }
    }

    /// Reads a remote context from `carrier` with the W3C propagator.
    ///
    /// Returns `None` when the carrier holds no valid `traceparent`. Versions
    /// above `00` are read by their first four fields.
    pub fn extract(carrier: &dyn Extractor) -> Option<Self> {
        let cx = TraceContextPropagator::new().extract(carrier);
        Self::from_otel(&cx)
    }

    /// Parses a single `traceparent` header value.
    pub fn from_traceparent(value: &str) -> Result<Self, TraceparentError> {
        let carrier = HashMap::from([(TRACEPARENT_HEADER.to_string(), value.to_string())]);
        Self::extract(&carrier).ok_or_else(|| TraceparentError::Invalid(value.to_string()))
    }

    /// The context of a `tracing` span, if the OpenTelemetry layer gave it ids.
    pub fn of_span(span: &tracing::Span) -> Option<Self> {
        Self::from_otel(&span.context())
    }

    /// Makes `span` a child of this context and returns the span's context.
    ///
    /// When `span` carries no OpenTelemetry ids a generated child stands in,
    /// so the returned context always belongs to this trace.
    pub fn join(&self, span: &tracing::Span) -> Self {
        span.set_parent(self.to_otel_context());
        match Self::of_span(span) {
            Some(own) => Self {
                parent_span_id: Some(self.span_id()),
                ..own
            },
            None => self.child(),
        }
    }

    /// Context to propagate for a call made inside `span` on behalf of this
    /// context.
    ///
    /// A span already nested in this trace keeps its own ids; any other span
    /// is re-parented through [`join`](Self::join).
    pub fn outbound(&self, span: &tracing::Span) -> Self {
        match Self::of_span(span) {
            Some(own) if own.trace_id() == self.trace_id() => own,
            _ => self.join(span),
        }
    }

    /// Returns a context for a new span in the same trace, parented to this one.
    pub fn child(&self) -> Self {
        Self {
            span_context: SpanContext::new(
                self.trace_id(),
                RandomIdGenerator::default().new_span_id(),
                self.span_context.trace_flags(),
                false,
                self.span_context.trace_state().clone(),
            ),
            parent_span_id: Some(self.span_id()),
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.span_context.trace_id()
    }

    pub fn span_id(&self) -> SpanId {
        self.span_context.span_id()
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    pub fn is_sampled(&self) -> bool {
        self.span_context.is_sampled()
    }

    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// An OpenTelemetry context with this span as the remote parent.
    pub fn to_otel_context(&self) -> Context {
        Context::new().with_remote_span_context(self.span_context.clone())
    }

    /// Writes the `traceparent` (and `tracestate`, when present) headers.
    pub fn inject(&self, carrier: &mut dyn Injector) {
        TraceContextPropagator::new().inject_context(&self.to_otel_context(), carrier);
    }

    /// Renders the `traceparent` header value for this context.
    pub fn traceparent(&self) -> String {
        let mut carrier: HashMap<String, String> = HashMap::new();
        self.inject(&mut carrier);
        carrier.remove(TRACEPARENT_HEADER).unwrap_or_default()
    }

    fn from_otel(cx: &Context) -> Option<Self> {
        let span_context = cx.span().span_context().clone();
        span_context.is_valid().then_some(Self {
            span_context,
            parent_span_id: None,
        })
    }
}

impl fmt::Display for CorrelationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.traceparent())
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::trace::TracerProvider;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    const SAMPLE: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn with_otel_layer<T>(f: impl FnOnce() -> T) -> T {
        let provider = TracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("correlation-test")));
        tracing::subscriber::with_default(subscriber, f)
    }

    #[test]
    fn test_parse_valid_traceparent() {
        let ctx = CorrelationContext::from_traceparent(SAMPLE).unwrap();
        assert_eq!(ctx.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id().to_string(), "00f067aa0ba902b7");
        assert!(ctx.is_sampled());
        assert_eq!(ctx.traceparent(), SAMPLE);
    }

    #[test]
    fn test_parse_unsampled_flag() {
        let ctx = CorrelationContext::from_traceparent(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00",
        )
        .unwrap();
        assert!(!ctx.is_sampled());
        assert!(ctx.traceparent().ends_with("-00"));
    }

    #[test]
    fn test_parse_future_version_reads_first_four_fields() {
        let ctx = CorrelationContext::from_traceparent(
            "01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra",
        )
        .unwrap();
        assert_eq!(ctx.trace_id().to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id().to_string(), "00f067aa0ba902b7");
        assert!(ctx.traceparent().starts_with("00-"));
    }

    #[test]
    fn test_parse_rejects_uppercase_hex() {
        assert!(
            CorrelationContext::from_traceparent(
                "00-4BF92F3577B34DA6A3CE929D0E0E4736-00f067aa0ba902b7-01"
            )
            .is_err()
        );
        assert!(
            CorrelationContext::from_traceparent(
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00F067AA0BA902B7-01"
            )
            .is_err()
        );
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        for value in [
            "",
            "00-abc",
            "00-4bf92f3577b34da6a3ce929d0e0e473z-00f067aa0ba902b7-01",
            "ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01-extra",
        ] {
            assert_eq!(
                CorrelationContext::from_traceparent(value),
                Err(TraceparentError::Invalid(value.to_string())),
                "{value:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_zero_ids() {
        assert!(
            CorrelationContext::from_traceparent(
                "00-00000000000000000000000000000000-00f067aa0ba902b7-01"
            )
            .is_err()
        );
        assert!(
            CorrelationContext::from_traceparent(
                "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01"
            )
            .is_err()
        );
    }

    #[test]
    fn test_child_keeps_trace_and_links_parent() {
        let root = CorrelationContext::new_root();
        let child = root.child();

        assert_eq!(child.trace_id(), root.trace_id());
        assert_ne!(child.span_id(), root.span_id());
        assert_eq!(child.parent_span_id(), Some(root.span_id()));
        assert_eq!(child.is_sampled(), root.is_sampled());
    }

    #[test]
    fn test_new_roots_are_distinct() {
        let a = CorrelationContext::new_root();
        let b = CorrelationContext::new_root();
        assert_ne!(a.trace_id(), b.trace_id());
        assert!(a.parent_span_id().is_none());
    }

    #[test]
    fn test_rendered_traceparent_parses_back() {
        let ctx = CorrelationContext::new_root();
        let header = ctx.to_string();
        assert_eq!(header.len(), 55);

        let parsed = CorrelationContext::from_traceparent(&header).unwrap();
        assert_eq!(parsed.trace_id(), ctx.trace_id());
        assert_eq!(parsed.span_id(), ctx.span_id());
    }

    #[test]
    fn test_join_without_layer_falls_back_to_child() {
        let remote = CorrelationContext::from_traceparent(SAMPLE).unwrap();
        let span = tracing::info_span!("http_request");

        let local = remote.join(&span);
        assert_eq!(local.trace_id(), remote.trace_id());
        assert_eq!(local.parent_span_id(), Some(remote.span_id()));
        assert!(CorrelationContext::of_span(&span).is_none());
    }

    #[test]
    fn test_join_uses_span_ids_when_layer_installed() {
        with_otel_layer(|| {
            let remote = CorrelationContext::from_traceparent(SAMPLE).unwrap();
            let span = tracing::info_span!("http_request");

            let local = remote.join(&span);
            let own = CorrelationContext::of_span(&span).unwrap();
            assert_eq!(local.trace_id(), remote.trace_id());
            assert_eq!(local.span_id(), own.span_id());
            assert_ne!(local.span_id(), remote.span_id());
            assert_eq!(local.parent_span_id(), Some(remote.span_id()));
        });
    }

    #[test]
    fn test_outbound_keeps_nested_span_ids() {
        with_otel_layer(|| {
            let request = tracing::info_span!("http_request");
            let ctx = CorrelationContext::new_root().join(&request);

            let _entered = request.enter();
            let call = tracing::info_span!("downstream_call");
            let outbound = ctx.outbound(&call);

            assert_eq!(outbound.trace_id(), ctx.trace_id());
            assert_eq!(
                outbound.span_id(),
                CorrelationContext::of_span(&call).unwrap().span_id()
            );
            assert_ne!(outbound.span_id(), ctx.span_id());
        });
    }

    #[test]
    fn test_outbound_reparents_foreign_span() {
        with_otel_layer(|| {
            let ctx = CorrelationContext::new_root();
            let call = tracing::info_span!("downstream_call");

            let outbound = ctx.outbound(&call);
            assert_eq!(outbound.trace_id(), ctx.trace_id());
            assert_eq!(outbound.parent_span_id(), Some(ctx.span_id()));
        });
    }
}
