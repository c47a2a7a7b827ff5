//! Payment service contract.

use domain::OrderRequest;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{DownstreamRequest, DownstreamResponse};
use crate::error::DownstreamError;

/// Service name used for endpoint lookup, span and metric labels.
pub const SERVICE: &str = "payment";

/// Path of the charge endpoint.
pub const CHARGE_PATH: &str = "/payment";

/// Order id sent to the payment service. Payment runs before the real order
/// id exists, so the service never learns it.
pub const PLACEHOLDER_ORDER_ID: &str = "temp-order";

/// Body of a charge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: String,
    pub user: String,
    pub amount: i64,
}

impl PaymentRequest {
    /// Charge for `request`, addressed to the placeholder order id.
    pub fn for_order(request: &OrderRequest) -> Self {
        Self {
            order_id: PLACEHOLDER_ORDER_ID.to_string(),
            user: request.user().to_string(),
            amount: request.amount(),
        }
    }

    pub fn into_downstream(self) -> Result<DownstreamRequest, DownstreamError> {
        let body = serde_json::to_value(&self).map_err(|e| DownstreamError::Serialization {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })?;
        Ok(DownstreamRequest::new(SERVICE, Method::POST, CHARGE_PATH).with_json(body))
    }
}

/// Successful charge answer. The service must return a JSON object; the
/// known fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl PaymentReceipt {
    pub fn from_response(response: &DownstreamResponse) -> Result<Self, DownstreamError> {
        response.json(SERVICE)
    }
}
