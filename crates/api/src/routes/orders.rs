//! Order creation and lookup endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use common::CorrelationContext;
use domain::{InMemoryOrderStore, OrderId, OrderRecord};
use orchestrator::{DownstreamClient, OrderOrchestrator};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<C: DownstreamClient> {
    pub orchestrator: OrderOrchestrator<C, InMemoryOrderStore>,
}

impl<C: DownstreamClient> AppState<C> {
    pub fn new(orchestrator: OrderOrchestrator<C, InMemoryOrderStore>) -> Self {
        Self { orchestrator }
    }
}

/// POST /orders: check inventory, take payment, store the order.
///
/// The body is taken raw so that malformed JSON and missing fields produce the
/// same `400 {"error":"invalid request"}`.
#[tracing::instrument(name = "order_request", skip_all)]
pub async fn create<C: DownstreamClient + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Extension(ctx): Extension<CorrelationContext>,
    body: Bytes,
) -> Result<Json<OrderRecord>, ApiError> {
    let record = state.orchestrator.create_order(&body, &ctx).await?;
    Ok(Json(record))
}

/// GET /orders/{id}: fetch a created order.
#[tracing::instrument(skip(state))]
pub async fn get<C: DownstreamClient + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderRecord>, ApiError> {
    state
        .orchestrator
        .get_order(&OrderId::new(id))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))
}
