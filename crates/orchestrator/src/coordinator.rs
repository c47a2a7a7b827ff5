//! Order orchestrator driving the creation pipeline.

use std::sync::Arc;
use std::time::Instant;

use common::{CorrelationContext, Meter};
use domain::{OrderId, OrderRecord, OrderRequest, OrderStore};

use crate::client::DownstreamClient;
use crate::error::OrderError;
use crate::ids::{OrderIdSource, RandomOrderIds};
use crate::services::{PaymentReceipt, PaymentRequest, inventory};
use crate::state::OrderState;

const ORDERS_TOTAL: &str = "orders_total";
const ORDER_DURATION: &str = "order_creation_duration_seconds";

/// Sequences validation, the inventory check, the payment call and the store
/// write for one order.
///
/// Both downstream calls carry the caller's [`CorrelationContext`]. A failure
/// at any step ends the attempt; nothing done before it is undone.
pub struct OrderOrchestrator<C, S>
where
    C: DownstreamClient,
    S: OrderStore,
{
    client: C,
    store: S,
    ids: Arc<dyn OrderIdSource>,
    meter: Meter,
}

impl<C, S> OrderOrchestrator<C, S>
where
    C: DownstreamClient,
    S: OrderStore,
{
    /// Creates an orchestrator with random order identifiers.
    pub fn new(client: C, store: S, meter: Meter) -> Self {
        meter.describe_counter(ORDERS_TOTAL, "Order creation attempts by outcome.");
        meter.describe_histogram(ORDER_DURATION, "End-to-end order creation latency.");
        Self {
            client,
            store,
            ids: Arc::new(RandomOrderIds),
            meter,
        }
    }

    /// Replaces the identifier source.
    pub fn with_id_source(mut self, ids: impl OrderIdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the whole pipeline for a raw request body.
    ///
    /// Returns the stored record, or the error of the step that failed.
    #[tracing::instrument(
        name = "create_order",
        skip_all,
        fields(trace_id = %ctx.trace_id(), span_id = %ctx.span_id(), order_id = tracing::field::Empty)
    )]
    pub async fn create_order(
        &self,
        body: &[u8],
        ctx: &CorrelationContext,
    ) -> Result<OrderRecord, OrderError> {
        let start = Instant::now();
        let mut state = OrderState::default();

        let result = self.run(body, ctx, &mut state).await;

        let outcome = match &result {
            Ok(record) => {
                tracing::info!(order_id = %record.id, product_id = %record.product_id, "order created");
                "created"
            }
            Err(err) => {
                tracing::warn!(
                    failed_in = %state,
                    kind = err.kind(),
                    error = %err,
                    "order rejected"
                );
                if state.can_reject() {
                    transition(&mut state, OrderState::Rejected);
                }
                err.kind()
            }
        };

        self.meter
            .counter(ORDERS_TOTAL, [("outcome", outcome.to_string())])
            .increment(1);
        self.meter
            .histogram(ORDER_DURATION, [("outcome", outcome.to_string())])
            .record(start.elapsed().as_secs_f64());

        result
    }

    /// Looks up a previously created order.
    pub async fn get_order(&self, id: &OrderId) -> Option<OrderRecord> {
        self.store.get(id).await
    }

    async fn run(
        &self,
        body: &[u8],
        ctx: &CorrelationContext,
        state: &mut OrderState,
    ) -> Result<OrderRecord, OrderError> {
        let request = OrderRequest::parse(body)?;
        advance(state);

        self.client.call(inventory::check_request(), ctx).await?;
        tracing::debug!("inventory available");
        advance(state);

        let payment = PaymentRequest::for_order(&request).into_downstream()?;
        let response = self.client.call(payment, ctx).await?;
        let receipt = PaymentReceipt::from_response(&response)?;
        tracing::debug!(
            payment_status = ?receipt.status,
            payment_id = ?receipt.payment_id,
            "payment accepted"
        );
        advance(state);

        let id = self.ids.next_id();
        tracing::Span::current().record("order_id", tracing::field::display(&id));
        let record = OrderRecord::created(id.clone(), &request);
        self.store.put(id, record.clone()).await;
        advance(state);

        Ok(record)
    }
}

fn advance(state: &mut OrderState) {
    if let Some(next) = state.next() {
        transition(state, next);
    }
}

fn transition(state: &mut OrderState, to: OrderState) {
    tracing::debug!(from = %state, to = %to, "order state transition");
    *state = to;
}
