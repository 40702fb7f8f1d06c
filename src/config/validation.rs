//! Configuration validation module
//!
//! This module provides additional validation logic for configuration
//! beyond the basic validator crate validation.

use crate::application::services::encryption::KeyWrapper;
use crate::config::app_config::{GatewayConfig, RateLimitConfig};
use crate::config::AppConfig;
use crate::shared::error::AppError;
use crate::shared::validation::{ValidationUtils, MAX_TEMP_ORDER_TIMEOUT_SECS};

/// Configuration validator for additional validation logic
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the complete configuration
    pub fn validate_config(config: &AppConfig) -> crate::Result<()> {
        Self::validate_gateway_config(&config.gateway)?;
        Self::validate_rate_limit_config(&config.rate_limit)?;
        Ok(())
    }

    /// Validate the gateway settings; a configured private key must parse and sign
    fn validate_gateway_config(gateway: &GatewayConfig) -> crate::Result<()> {
        if !gateway.receipt_url_template.contains("{order_id}") {
            return Err(AppError::Config("receipt_url_template must contain {order_id}".to_string()));
        }

        let requested = ValidationUtils::parse_time_to_seconds(&gateway.temp_order_deletion_time);
        if requested > MAX_TEMP_ORDER_TIMEOUT_SECS {
            tracing::warn!(
                requested_secs = requested,
                max_secs = MAX_TEMP_ORDER_TIMEOUT_SECS,
                "temp_order_deletion_time is capped"
            );
        }

        if !gateway.private_key.trim().is_empty() {
            KeyWrapper::from_pem(&gateway.private_key)?.probe()?;
        } else if gateway.enabled && !gateway.test_mode {
            tracing::warn!("Gateway enabled without a private key; checkout will report unavailable");
        }

        if gateway.test_mode {
            tracing::warn!("Gateway test mode is on; checkout payloads are sent unencrypted");
        }

        Ok(())
    }

    /// Validate rate limiting configuration
    fn validate_rate_limit_config(rate_limit: &RateLimitConfig) -> crate::Result<()> {
        if rate_limit.enabled && rate_limit.burst_size > rate_limit.requests_per_minute {
            return Err(AppError::Config("Burst size cannot be greater than requests per minute".to_string()));
        }
        Ok(())
    }

    /// Whether the gateway may be offered to shoppers
    pub fn gateway_available(gateway: &GatewayConfig) -> bool {
        if !gateway.enabled || gateway.access_key.trim().is_empty() || gateway.storefront().is_empty() {
            return false;
        }
        if gateway.private_key.trim().is_empty() {
            return gateway.test_mode;
        }
        KeyWrapper::from_pem(&gateway.private_key).is_ok()
    }
}
