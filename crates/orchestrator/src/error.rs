//! Orchestrator error types.

use domain::ValidationError;
use thiserror::Error;

use crate::client::ErrorBody;

/// Failure of a single outbound call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DownstreamError {
    /// The service could not be reached (connect failure, timeout, reset).
    #[error("{service} service unreachable: {reason}")]
    Unreachable { service: String, reason: String },

    /// The service answered with a non-2xx status.
    #[error("{service} service responded with status {status}")]
    Rejected {
        service: String,
        status: u16,
        body: ErrorBody,
    },

    /// The service answered 2xx but the body did not have the expected shape.
    #[error("invalid {service} response: {reason}")]
    Serialization { service: String, reason: String },
}

impl DownstreamError {
    /// Name of the service the failed call was addressed to.
    pub fn service(&self) -> &str {
        match self {
            DownstreamError::Unreachable { service, .. }
            | DownstreamError::Rejected { service, .. }
            | DownstreamError::Serialization { service, .. } => service,
        }
    }
}

/// Terminal failure of an order creation attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    /// The request body failed validation. No downstream call was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// A downstream service could not be reached.
    #[error("Failed to contact {service}: {reason}")]
    DownstreamUnreachable { service: String, reason: String },

    /// A downstream service rejected the call; its status and body are kept
    /// so they can be forwarded to the client.
    #[error("{service} service error (status {status})")]
    DownstreamRejected {
        service: String,
        status: u16,
        body: ErrorBody,
    },

    /// A downstream service returned a success status with an unusable body.
    #[error("Invalid {service} response: {reason}")]
    SerializationFailure { service: String, reason: String },
}

impl OrderError {
    /// Short label used for the `outcome` metric label and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest(_) => "invalid_request",
            OrderError::DownstreamUnreachable { .. } => "downstream_unreachable",
            OrderError::DownstreamRejected { .. } => "downstream_rejected",
            OrderError::SerializationFailure { .. } => "serialization_failure",
        }
    }
}

impl From<DownstreamError> for OrderError {
    fn from(err: DownstreamError) -> Self {
        match err {
            DownstreamError::Unreachable { service, reason } => {
                OrderError::DownstreamUnreachable { service, reason }
            }
            DownstreamError::Rejected {
                service,
                status,
                body,
            } => OrderError::DownstreamRejected {
                service,
                status,
                body,
            },
            DownstreamError::Serialization { service, reason } => {
                OrderError::SerializationFailure { service, reason }
            }
        }
    }
}
