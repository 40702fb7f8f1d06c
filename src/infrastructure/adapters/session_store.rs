//! Checkout session store
//!
//! Redis is the source of truth when configured. Otherwise sessions live in an
//! in-process map whose entries expire like the Redis keys would.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::domain::checkout::CheckoutSession;
use crate::domain::orders::OrderId;
use crate::shared::error::{AppError, AppResult};

/// Session records are kept for two days in Redis
const SESSION_TTL_SECONDS: u64 = 48 * 3600;

/// Expired memory entries are swept once the map grows past this
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct MemoryEntry {
    session: CheckoutSession,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    redis: Option<Arc<ConnectionManager>>,
    memory: Arc<tokio::sync::RwLock<HashMap<String, MemoryEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(redis: Option<Arc<ConnectionManager>>) -> Self {
        Self {
            redis,
            memory: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            ttl: Duration::seconds(SESSION_TTL_SECONDS as i64),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Override how long an untouched in-memory session is kept
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn key(session_id: &str) -> String {
        format!("checkout:session:{}", session_id)
    }

    pub async fn put(&self, session: &CheckoutSession) -> AppResult<()> {
        if let Some(redis) = &self.redis {
            let serialized = serde_json::to_vec(session)
                .map_err(|e| AppError::Internal(format!("serialize session: {}", e)))?;
            let mut conn = (**redis).clone();
            let _: () = conn.set_ex(Self::key(&session.session_id), serialized, SESSION_TTL_SECONDS).await?;
            return Ok(());
        }

        let now = Utc::now();
        let mut memory = self.memory.write().await;
        if memory.len() >= PRUNE_THRESHOLD {
            memory.retain(|_, entry| entry.expires_at > now);
        }
        memory.insert(
            session.session_id.clone(),
            MemoryEntry { session: session.clone(), expires_at: now + self.ttl },
        );
        Ok(())
    }

    pub async fn get(&self, session_id: &str) -> AppResult<Option<CheckoutSession>> {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let data: Option<Vec<u8>> = conn.get(Self::key(session_id)).await?;
            return match data {
                Some(bytes) => serde_json::from_slice(&bytes)
                    .map(Some)
                    .map_err(|e| AppError::Internal(format!("deserialize session: {}", e))),
                None => Ok(None),
            };
        }

        let now = Utc::now();
        {
            let memory = self.memory.read().await;
            match memory.get(session_id) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.session.clone())),
                Some(_) => {}
            }
        }
        self.memory.write().await.remove(session_id);
        Ok(None)
    }

    /// Sessions currently held in process memory
    pub async fn memory_len(&self) -> usize {
        self.memory.read().await.len()
    }

    /// Existing session, or a fresh one persisted under `session_id`
    pub async fn get_or_create(&self, session_id: &str) -> AppResult<CheckoutSession> {
        if let Some(session) = self.get(session_id).await? {
            return Ok(session);
        }
        let session = CheckoutSession::new(session_id);
        self.put(&session).await?;
        Ok(session)
    }

    pub async fn order_awaiting_payment(&self, session_id: &str) -> AppResult<Option<OrderId>> {
        Ok(self.get(session_id).await?.and_then(|s| s.order_awaiting_payment))
    }

    pub async fn set_order_awaiting_payment(&self, session_id: &str, order_id: Option<OrderId>) -> AppResult<()> {
        let mut session = self.get_or_create(session_id).await?;
        session.order_awaiting_payment = order_id;
        self.put(&session).await
    }

    pub async fn remove(&self, session_id: &str) -> AppResult<()> {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let _: () = conn.del(Self::key(session_id)).await?;
            return Ok(());
        }
        self.memory.write().await.remove(session_id);
        Ok(())
    }

    /// Re-key a session, keeping its order marker; returns the new record
    pub async fn transfer(&self, from: &str, to: &str) -> AppResult<CheckoutSession> {
        let marker = self.order_awaiting_payment(from).await?;
        let mut session = self.get_or_create(to).await?;
        if marker.is_some() {
            session.order_awaiting_payment = marker;
            self.put(&session).await?;
        }
        if from != to {
            self.remove(from).await?;
        }
        Ok(session)
    }
}
