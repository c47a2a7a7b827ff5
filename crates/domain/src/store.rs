//! Order storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::order::{OrderId, OrderRecord};

/// Process-lifetime storage for order records.
///
/// `put` does not enforce uniqueness: writing an identifier that is already
/// present replaces the earlier record. Identifier generation is random, so
/// two orders can collide and the later one wins.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a record, replacing any record already stored under `id`.
    async fn put(&self, id: OrderId, record: OrderRecord);

    /// Returns the record stored under `id`, if any.
    async fn get(&self, id: &OrderId) -> Option<OrderRecord>;

    /// Number of stored records.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Lock-guarded in-memory order store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored record, in no particular order.
    pub async fn all(&self) -> Vec<OrderRecord> {
        self.orders.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn put(&self, id: OrderId, record: OrderRecord) {
        let mut orders = self.orders.write().await;
        if let Some(previous) = orders.insert(id, record) {
            tracing::warn!(order_id = %previous.id, "order id reused, previous record replaced");
        }
    }

    async fn get(&self, id: &OrderId) -> Option<OrderRecord> {
        self.orders.read().await.get(id).cloned()
    }

    async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}
