//! Logging utilities module
//!
//! This module provides centralized logging functionality and utilities.

use tracing::{info, warn};

use crate::domain::orders::OrderId;
use crate::shared::error::AppError;

/// Logging utilities for the application
pub struct LoggingUtils;

impl LoggingUtils {
    /// Initialize logging with the specified configuration
    pub fn initialize(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }

    /// Log a provisional order transition
    pub fn log_transition(session_id: &str, order_id: OrderId, transition: &str) {
        info!(
            session_id = %session_id,
            order_id = %order_id,
            transition = %transition,
            "Provisional order transition"
        );
    }

    /// Log a rejected checkout request with server-side detail
    pub fn log_rejection(request_id: &str, action: &str, error: &AppError) {
        warn!(
            request_id = %request_id,
            action = %action,
            kind = %error.kind(),
            error = %error,
            "Checkout request rejected"
        );
    }

    /// Log rate limiting events
    pub fn log_rate_limit(client_ip: &str, action: &str) {
        warn!(
            client_ip = %client_ip,
            action = %action,
            "Rate limit exceeded"
        );
    }

    /// Generate a unique request ID
    pub fn generate_request_id() -> String {
        format!("req_{}", uuid::Uuid::new_v4().simple())
    }
}
