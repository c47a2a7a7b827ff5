//! Inbound order request parsing and validation.

use serde::Deserialize;

use crate::error::ValidationError;

/// Wire shape of `POST /orders`. Every field is optional here so that a
/// missing field is reported by name instead of as a generic parse error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderRequest {
    product_id: Option<String>,
    quantity: Option<i64>,
    user: Option<String>,
    amount: Option<i64>,
}

/// A validated order request.
///
/// Only constructed through [`OrderRequest::parse`] or [`OrderRequest::new`],
/// both of which enforce the field constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    product_id: String,
    quantity: i64,
    user: String,
    amount: i64,
}

impl OrderRequest {
    /// Builds a request from already-typed values, applying the same checks
    /// as [`parse`](Self::parse).
    pub fn new(
        product_id: impl Into<String>,
        quantity: i64,
        user: impl Into<String>,
        amount: i64,
    ) -> Result<Self, ValidationError> {
        let product_id = product_id.into();
        if product_id.is_empty() {
            return Err(ValidationError::EmptyProductId);
        }
        if quantity <= 0 {
            return Err(ValidationError::InvalidQuantity(quantity));
        }
        if amount < 0 {
            return Err(ValidationError::InvalidAmount(amount));
        }
        Ok(Self {
            product_id,
            quantity,
            user: user.into(),
            amount,
        })
    }

    /// Parses and validates a JSON request body.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        let raw: RawOrderRequest = serde_json::from_slice(body)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;

        let product_id = raw
            .product_id
            .ok_or(ValidationError::MissingField("productId"))?;
        let quantity = raw
            .quantity
            .ok_or(ValidationError::MissingField("quantity"))?;
        let user = raw.user.ok_or(ValidationError::MissingField("user"))?;
        let amount = raw.amount.ok_or(ValidationError::MissingField("amount"))?;

        Self::new(product_id, quantity, user, amount)
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Amount in minor currency units, as the payment service expects it.
    pub fn amount(&self) -> i64 {
        self.amount
    }
}
