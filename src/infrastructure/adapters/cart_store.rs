//! Cart collaborator

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cart::Cart;
use crate::shared::error::AppResult;

/// Read access to the shopper's cart, keyed by checkout session
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Current cart; an unknown session has an empty cart
    async fn cart(&self, session_id: &str) -> AppResult<Cart>;

    async fn empty(&self, session_id: &str) -> AppResult<()>;

    /// Move a cart to a new session id
    async fn transfer(&self, from: &str, to: &str) -> AppResult<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<tokio::sync::RwLock<HashMap<String, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, session_id: &str, cart: Cart) {
        self.carts.write().await.insert(session_id.to_string(), cart);
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn cart(&self, session_id: &str) -> AppResult<Cart> {
        Ok(self.carts.read().await.get(session_id).cloned().unwrap_or_default())
    }

    async fn empty(&self, session_id: &str) -> AppResult<()> {
        self.carts.write().await.remove(session_id);
        Ok(())
    }

    async fn transfer(&self, from: &str, to: &str) -> AppResult<()> {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts.remove(from) {
            carts.insert(to.to_string(), cart);
        }
        Ok(())
    }
}
