//! Per-client rate limiting for checkout endpoints

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::app_config::RateLimitConfig;
use crate::shared::error::{AppError, AppResult};
use crate::shared::logging::LoggingUtils;

/// Keyed limiter shared by all checkout routes, keyed on client IP
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl RateLimitMiddleware {
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { limiter: None };
        }

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self { limiter: Some(Arc::new(RateLimiter::keyed(quota))) }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Count one request for `client_ip`
    pub fn check_rate_limit(&self, client_ip: &str, action: &str) -> AppResult<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        if limiter.check_key(&client_ip.to_string()).is_err() {
            LoggingUtils::log_rate_limit(client_ip, action);
            return Err(AppError::RateLimit);
        }

        // Drop state for clients whose quota has fully replenished
        if limiter.len() > 10_000 {
            limiter.retain_recent();
        }
        Ok(())
    }
}
