//! Error handling module
//!
//! This module provides centralized error handling for the application.

use thiserror::Error;

/// Message returned for every credential failure, whatever the cause
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request";

/// Message returned for failures whose detail stays in the server logs
pub const GENERIC_FAILURE_MESSAGE: &str = "We were unable to process your order, please try again.";

/// Application error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key configuration error: {0}")]
    CryptoConfig(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Checkout blocked ({kind}): {message}")]
    CreationBlocked { result: String, kind: String, message: String },

    #[error("{}", INVALID_REQUEST_MESSAGE)]
    InvalidCredential,

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External dependency error: {0}")]
    ExternalDependency(String),

    #[error("Payment gateway is not available")]
    GatewayUnavailable,

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("JSON serialization error: {0}")]
    Json(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable kind, used as the `type` field of error bodies and as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::CryptoConfig(_) => "crypto_config",
            AppError::Validation(_) => "validation",
            AppError::EmptyCart => "empty_cart",
            AppError::CreationBlocked { .. } => "temp_order_blocked",
            AppError::InvalidCredential => "invalid",
            AppError::StateConflict(_) => "state_conflict",
            AppError::NotFound(_) => "not_found",
            AppError::ExternalDependency(_) => "external",
            AppError::GatewayUnavailable => "unavailable",
            AppError::RateLimit => "rate_limit",
            AppError::Json(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }

    /// Messages safe to show to the shopper
    pub fn client_messages(&self) -> Vec<String> {
        match self {
            AppError::Validation(messages) => messages.clone(),
            AppError::EmptyCart => vec![
                "Your cart is empty. Please add items to your cart before attempting to checkout.".to_string(),
            ],
            AppError::CreationBlocked { message, .. } => vec![message.clone()],
            AppError::InvalidCredential => vec![INVALID_REQUEST_MESSAGE.to_string()],
            AppError::GatewayUnavailable => vec![self.to_string()],
            AppError::RateLimit => vec!["Too many requests, please slow down.".to_string()],
            AppError::Json(_) => vec![INVALID_REQUEST_MESSAGE.to_string()],
            _ => vec![GENERIC_FAILURE_MESSAGE.to_string()],
        }
    }

    /// Whether the client should refresh its checkout state before retrying
    pub fn requires_refresh(&self) -> bool {
        matches!(self, AppError::InvalidCredential | AppError::StateConflict(_) | AppError::NotFound(_))
    }

    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            AppError::Validation(_) | AppError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CreationBlocked { .. } => StatusCode::FORBIDDEN,
            AppError::InvalidCredential => StatusCode::FORBIDDEN,
            AppError::StateConflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::CONFLICT,
            AppError::ExternalDependency(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayUnavailable | AppError::CryptoConfig(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

impl warp::reject::Reject for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("credential encoding: {}", err))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::ExternalDependency(format!("redis: {}", err))
    }
}
