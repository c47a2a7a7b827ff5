//! Outbound calls to downstream services.

mod http;
#[cfg(any(test, feature = "test-util"))]
mod scripted;

pub use http::{HttpDownstreamClient, HttpDownstreamClientBuilder};
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{RecordedCall, ScriptedDownstreamClient};

use async_trait::async_trait;
use common::CorrelationContext;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::DownstreamError;

/// A single call to a named downstream service.
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamRequest {
    pub service: String,
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl DownstreamRequest {
    pub fn new(service: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attaches a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw answer from a downstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl DownstreamResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx answer into [`DownstreamError::Rejected`].
    pub fn error_for_status(self, service: &str) -> Result<Self, DownstreamError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DownstreamError::Rejected {
                service: service.to_string(),
                status: self.status,
                body: ErrorBody::from_bytes(&self.body),
            })
        }
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, service: &str) -> Result<T, DownstreamError> {
        serde_json::from_slice(&self.body).map_err(|e| DownstreamError::Serialization {
            service: service.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Error body returned by a downstream service, kept for forwarding.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// A JSON object or array.
    Json(serde_json::Value),
    /// Anything else, as text. A bare JSON string is unwrapped into this.
    Text(String),
}

impl ErrorBody {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                ErrorBody::Json(value)
            }
            Ok(serde_json::Value::String(text)) => ErrorBody::Text(text),
            _ => ErrorBody::Text(String::from_utf8_lossy(bytes).trim_end().to_string()),
        }
    }
}

/// Performs outbound calls, propagating the caller's trace context.
///
/// Implementations make exactly one attempt per call and never retry.
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    /// Sends `request` with a `traceparent` in `ctx`'s trace so the callee joins
    /// the same trace. Non-2xx answers come back as
    /// [`DownstreamError::Rejected`].
    async fn call(
        &self,
        request: DownstreamRequest,
        ctx: &CorrelationContext,
    ) -> Result<DownstreamResponse, DownstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_json_object() {
        let body = ErrorBody::from_bytes(br#"{"reason":"declined"}"#);
        assert_eq!(
            body,
            ErrorBody::Json(serde_json::json!({ "reason": "declined" }))
        );
    }

    #[test]
    fn test_error_body_plain_text() {
        let body = ErrorBody::from_bytes(b"insufficient funds\n");
        assert_eq!(body, ErrorBody::Text("insufficient funds".to_string()));
    }

    #[test]
    fn test_error_body_json_string_is_text() {
        let body = ErrorBody::from_bytes(br#""insufficient funds""#);
        assert_eq!(body, ErrorBody::Text("insufficient funds".to_string()));
    }

    #[test]
    fn test_error_for_status() {
        let ok = DownstreamResponse::new(204, Vec::new());
        assert!(ok.error_for_status("inventory").is_ok());

        let err = DownstreamResponse::new(402, "insufficient funds")
            .error_for_status("payment")
            .unwrap_err();
        assert_eq!(
            err,
            DownstreamError::Rejected {
                service: "payment".to_string(),
                status: 402,
                body: ErrorBody::Text("insufficient funds".to_string()),
            }
        );
    }

    #[test]
    fn test_json_decode_failure_is_serialization_error() {
        let response = DownstreamResponse::new(200, "not json");
        let err = response.json::<serde_json::Value>("payment").unwrap_err();
        assert!(matches!(err, DownstreamError::Serialization { .. }));
    }
}
