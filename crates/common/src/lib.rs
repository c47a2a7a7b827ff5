//! Shared types for the order service.
//!
//! - [`CorrelationContext`]: per-request trace identity propagated to
//!   downstream calls and log lines.
//! - [`Meter`]: metrics handle injected into components at construction.

pub mod correlation;
pub mod meter;

pub use correlation::{CorrelationContext, SpanId, TRACEPARENT_HEADER, TraceId, TraceparentError};
pub use meter::Meter;
