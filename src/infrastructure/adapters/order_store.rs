//! Provisional order persistence

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::orders::{OrderId, OrderTag, ProvisionalOrder};
use crate::shared::error::{AppError, AppResult};

/// Order collaborator used by the temp order lifecycle
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a draft, assigning its id and tagging it temporary in one step
    async fn create_temporary(&self, draft: ProvisionalOrder) -> AppResult<ProvisionalOrder>;

    async fn get(&self, id: OrderId) -> AppResult<Option<ProvisionalOrder>>;

    /// Overwrite an existing order; `NotFound` if it was deleted meanwhile
    async fn save(&self, order: &ProvisionalOrder) -> AppResult<()>;

    /// Returns whether an order was removed
    async fn delete(&self, id: OrderId) -> AppResult<bool>;

    /// Ids of temporary orders created strictly before `cutoff`
    async fn find_temporary_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<OrderId>>;
}

#[derive(Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<tokio::sync::RwLock<HashMap<OrderId, ProvisionalOrder>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_temporary(&self, mut draft: ProvisionalOrder) -> AppResult<ProvisionalOrder> {
        draft.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        draft.tag = Some(OrderTag::Temporary);
        self.orders.write().await.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn get(&self, id: OrderId) -> AppResult<Option<ProvisionalOrder>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save(&self, order: &ProvisionalOrder) -> AppResult<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("order {}", order.id))),
        }
    }

    async fn delete(&self, id: OrderId) -> AppResult<bool> {
        Ok(self.orders.write().await.remove(&id).is_some())
    }

    async fn find_temporary_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<OrderId>> {
        let mut ids: Vec<OrderId> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.is_temporary() && o.created_at < cutoff)
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
