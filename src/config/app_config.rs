//! Application configuration structures
//!
//! This module contains the main configuration structures for the application.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use validator::Validate;

use crate::domain::orders::OrderStatus;
use crate::shared::validation::ValidationUtils;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server address to bind to
    pub bind_address: IpAddr,

    /// Server port
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Maximum request size in bytes
    #[validate(range(min = 1024, max = 10485760))] // 1KB to 10MB
    pub max_request_size: usize,

    /// Proxy headers trusted for client identification
    #[serde(default = "default_trusted_proxy_headers")]
    pub trusted_proxy_headers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            max_request_size: 256 * 1024,
            trusted_proxy_headers: default_trusted_proxy_headers(),
        }
    }
}

fn default_trusted_proxy_headers() -> Vec<String> {
    vec!["X-Forwarded-For".to_string()]
}

impl ServerConfig {
    /// Whether `X-Forwarded-For` may name the client
    pub fn trusts_forwarded_for(&self) -> bool {
        self.trusted_proxy_headers.iter().any(|h| h.trim().eq_ignore_ascii_case("x-forwarded-for"))
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Requests per minute per client IP
    #[validate(range(min = 1, max = 10000))]
    pub requests_per_minute: u32,

    /// Burst size
    #[validate(range(min = 1, max = 1000))]
    pub burst_size: u32,

    /// Enable rate limiting
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_minute: 120, burst_size: 20, enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Single-use credential signing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CredentialConfig {
    /// HMAC secret used to sign credentials
    #[validate(length(min = 32))]
    pub secret_key: String,

    /// Lifetime of session and receipt credentials in seconds
    #[validate(range(min = 60, max = 86400))]
    pub expiration_seconds: u64,

    #[validate(length(min = 1))]
    pub issuer: String,

    #[validate(length(min = 1))]
    pub audience: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            secret_key: "change-me-checkout-credential-secret-0123456789".to_string(),
            expiration_seconds: 3600,
            issuer: "checkout-bridge".to_string(),
            audience: "storefront".to_string(),
        }
    }
}

/// Hosted payment gateway settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    pub enabled: bool,

    /// Payment method id accepted on checkout submissions
    #[validate(length(min = 1))]
    pub gateway_id: String,

    #[validate(length(min = 1))]
    pub title: String,

    pub access_key: String,

    /// Merchant RSA private key (PKCS#1 or PKCS#8 PEM)
    pub private_key: String,

    pub storefront_path: String,

    /// Send payloads unencrypted so integrators can inspect them
    pub test_mode: bool,

    /// Human-readable provisional order lifetime, e.g. "24h" or "1h 30m"
    pub temp_order_deletion_time: String,

    /// ISO currency code used as the price key
    #[validate(length(equal = 3))]
    pub currency: String,

    #[validate(length(min = 1))]
    pub placeholder_image_url: String,

    /// Receipt page URL; `{order_id}` is substituted
    #[validate(length(min = 1))]
    pub receipt_url_template: String,

    /// Statuses under which a provisional order may no longer be updated
    pub disallowed_update_statuses: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gateway_id: "fastspring".to_string(),
            title: "Credit card / PayPal".to_string(),
            access_key: String::new(),
            private_key: String::new(),
            storefront_path: String::new(),
            test_mode: false,
            temp_order_deletion_time: "24h".to_string(),
            currency: "USD".to_string(),
            placeholder_image_url: "https://localhost/assets/placeholder.png".to_string(),
            receipt_url_template: "/checkout/order-received/{order_id}".to_string(),
            disallowed_update_statuses: vec!["completed".to_string(), "refunded".to_string()],
        }
    }
}

impl GatewayConfig {
    /// Provisional order lifetime; unparseable values fall back to 24 hours
    pub fn temp_order_timeout(&self) -> Duration {
        Duration::from_secs(ValidationUtils::temp_order_timeout_seconds(&self.temp_order_deletion_time))
    }

    /// Client popup timeout mirroring the provisional order lifetime
    pub fn popup_timeout_ms(&self) -> u64 {
        self.temp_order_timeout().as_secs().saturating_mul(1000)
    }

    pub fn storefront(&self) -> String {
        ValidationUtils::normalize_storefront_path(&self.storefront_path)
    }

    pub fn disallowed_statuses(&self) -> Vec<OrderStatus> {
        self.disallowed_update_statuses
            .iter()
            .filter_map(|s| match s.parse::<OrderStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unknown disallowed update status");
                    None
                }
            })
            .collect()
    }

    pub fn receipt_url(&self, order_id: u64) -> String {
        self.receipt_url_template.replace("{order_id}", &order_id.to_string())
    }
}

/// Session store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SessionStoreConfig {
    /// Optional Redis URL; sessions stay in memory when absent
    #[validate(url)]
    pub redis_url: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialConfig,
    pub gateway: GatewayConfig,
    pub session_store: SessionStoreConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> crate::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("Checkout").required(false))
            .add_source(config::Environment::with_prefix("CHECKOUT").separator("__"))
            .build()
            .map_err(|e| crate::shared::error::AppError::Config(format!("Failed to build configuration: {}", e)))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| crate::shared::error::AppError::Config(format!("Failed to deserialize configuration: {}", e)))?;

        config
            .validate_config()
            .map_err(|e| crate::shared::error::AppError::Config(format!("Configuration validation failed: {}", e)))?;

        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_config(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.rate_limit.validate()?;
        self.logging.validate()?;
        self.credentials.validate()?;
        self.gateway.validate()?;
        self.session_store.validate()?;
        Ok(())
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
