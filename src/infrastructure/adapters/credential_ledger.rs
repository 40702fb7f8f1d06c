//! Ledger of consumed single-use credential ids (Redis-backed with memory fallback)

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;

use crate::shared::error::AppResult;

/// Upper bound on how long a consumed id is remembered
const MAX_TTL_SECONDS: u64 = 30 * 24 * 3600;

#[derive(Clone)]
pub struct CredentialLedger {
    redis: Option<Arc<ConnectionManager>>,
    memory: Arc<tokio::sync::Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl CredentialLedger {
    pub fn new(redis: Option<Arc<ConnectionManager>>) -> Self {
        Self {
            redis,
            memory: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    fn key(jti: &str) -> String {
        format!("checkout:credential:used:{}", jti)
    }

    /// Mark `jti` as used. Returns `true` only for the first caller.
    pub async fn consume(&self, jti: &str, ttl_seconds: u64) -> AppResult<bool> {
        let ttl_seconds = ttl_seconds.clamp(1, MAX_TTL_SECONDS);
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let set: Option<String> = redis::cmd("SET")
                .arg(Self::key(jti))
                .arg(1u8)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await?;
            return Ok(set.is_some());
        }

        let now = Utc::now();
        let mut used = self.memory.lock().await;
        used.retain(|_, expires| *expires > now);
        if used.contains_key(jti) {
            return Ok(false);
        }
        let expires = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        used.insert(jti.to_string(), expires);
        Ok(true)
    }
}
