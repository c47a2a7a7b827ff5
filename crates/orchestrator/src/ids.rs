//! Order identifier generation.

use domain::OrderId;
use rand::Rng;

/// Identifiers are drawn from `0..ORDER_ID_BOUND`.
pub const ORDER_ID_BOUND: u32 = 100_000;

/// Source of identifiers for new orders.
pub trait OrderIdSource: Send + Sync {
    fn next_id(&self) -> OrderId;
}

/// Uniform random identifiers below [`ORDER_ID_BOUND`].
///
/// No collision detection: two orders may draw the same identifier, in which
/// case the later one replaces the earlier in the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrderIds;

impl OrderIdSource for RandomOrderIds {
    fn next_id(&self) -> OrderId {
        OrderId::from_number(rand::thread_rng().gen_range(0..ORDER_ID_BOUND))
    }
}

/// Always hands out the same identifier.
#[derive(Debug, Clone)]
pub struct FixedOrderIds(OrderId);

impl FixedOrderIds {
    pub fn new(id: impl Into<String>) -> Self {
        Self(OrderId::new(id))
    }
}

impl OrderIdSource for FixedOrderIds {
    fn next_id(&self) -> OrderId {
        self.0.clone()
    }
}
