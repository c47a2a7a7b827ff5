//! The order record produced by a successful order creation.

use serde::{Deserialize, Serialize};

use super::OrderRequest;

/// Opaque order identifier.
///
/// Identifiers are drawn at random and are not guaranteed to be unique; see
/// [`OrderStore`](crate::OrderStore) for what happens on a collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Renders a numeric identifier as its decimal string.
    pub fn from_number(n: u32) -> Self {
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of an order. Only `created` exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Created,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order that passed inventory and payment. Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    pub product_id: String,
    pub quantity: i64,
    pub user: String,
    pub status: OrderStatus,
}

impl OrderRecord {
    /// Builds a `created` record echoing the request's product, quantity and user.
    pub fn created(id: OrderId, request: &OrderRequest) -> Self {
        Self {
            id,
            product_id: request.product_id().to_string(),
            quantity: request.quantity(),
            user: request.user().to_string(),
            status: OrderStatus::Created,
        }
    }
}
