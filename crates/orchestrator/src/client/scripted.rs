//! In-memory [`DownstreamClient`] with scripted answers.
//!
//! A test double: compiled for this crate's tests and, for other crates,
//! behind the `test-util` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use common::CorrelationContext;
use reqwest::Method;

use super::{DownstreamClient, DownstreamRequest, DownstreamResponse};
use crate::error::DownstreamError;

/// A call observed by [`ScriptedDownstreamClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: String,
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// The `traceparent` value that would have been sent.
    pub traceparent: String,
}

#[derive(Debug, Default)]
struct ScriptState {
    outcomes: HashMap<String, Result<DownstreamResponse, DownstreamError>>,
    calls: Vec<RecordedCall>,
}

/// Downstream client that answers from a per-service script.
///
/// Unscripted services answer `200` with an empty JSON object. Non-2xx
/// scripted answers surface as [`DownstreamError::Rejected`], exactly as the
/// HTTP client reports them.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDownstreamClient {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedDownstreamClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the status and body `service` answers with.
    pub fn respond(&self, service: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.lock()
            .outcomes
            .insert(service.to_string(), Ok(DownstreamResponse::new(status, body)));
    }

    /// Scripts `service` as unreachable.
    pub fn unreachable(&self, service: &str) {
        self.lock().outcomes.insert(
            service.to_string(),
            Err(DownstreamError::Unreachable {
                service: service.to_string(),
                reason: "connection refused".to_string(),
            }),
        );
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Calls made to one service.
    pub fn calls_to(&self, service: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.service == service)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DownstreamClient for ScriptedDownstreamClient {
    async fn call(
        &self,
        request: DownstreamRequest,
        ctx: &CorrelationContext,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let outbound = ctx.child();
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            service: request.service.clone(),
            method: request.method,
            path: request.path,
            body: request.body,
            traceparent: outbound.traceparent(),
        });

        let outcome = state
            .outcomes
            .get(&request.service)
            .cloned()
            .unwrap_or_else(|| Ok(DownstreamResponse::new(200, "{}")));
        outcome?.error_for_status(&request.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_answer_is_ok() {
        let client = ScriptedDownstreamClient::new();
        let ctx = CorrelationContext::new_root();

        let response = client
            .call(DownstreamRequest::new("inventory", Method::GET, "/inventory"), &ctx)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(client.call_count(), 1);
        let call = &client.calls()[0];
        assert!(call.traceparent.contains(&ctx.trace_id().to_string()));
        assert!(!call.traceparent.contains(&ctx.span_id().to_string()));
    }

    #[tokio::test]
    async fn test_scripted_rejection() {
        let client = ScriptedDownstreamClient::new();
        client.respond("payment", 402, "insufficient funds");

        let err = client
            .call(
                DownstreamRequest::new("payment", Method::POST, "/payment"),
                &CorrelationContext::new_root(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DownstreamError::Rejected { status: 402, .. }));
        assert_eq!(client.calls_to("payment").len(), 1);
        assert!(client.calls_to("inventory").is_empty());
    }

    #[tokio::test]
    async fn test_scripted_unreachable() {
        let client = ScriptedDownstreamClient::new();
        client.unreachable("inventory");

        let err = client
            .call(
                DownstreamRequest::new("inventory", Method::GET, "/inventory"),
                &CorrelationContext::new_root(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.service(), "inventory");
        assert!(matches!(err, DownstreamError::Unreachable { .. }));
    }
}
