//! Domain error types.

use thiserror::Error;

/// Reasons an inbound order body is rejected before any downstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The body is not JSON, or a field has the wrong type.
    #[error("Malformed order request: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Product identifier is present but empty.
    #[error("Product ID must not be empty")]
    EmptyProductId,

    /// Invalid quantity.
    #[error("Invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(i64),

    /// Invalid amount.
    #[error("Invalid amount: {0} (must not be negative)")]
    InvalidAmount(i64),
}
