//! Checkout Bridge - Checkout session and secure payload pipeline
//!
//! This library bridges a storefront cart and a hosted payment widget: it
//! keeps one provisional order per shopper session, issues single-use
//! credentials for every checkout call, and seals the cart payload for the
//! widget.

pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod middleware;
pub mod shared;

#[cfg(test)]
mod tests;

pub use application::services::checkout_service::{CheckoutCoordinator, CheckoutDependencies};
pub use application::services::extensions::CheckoutExtensions;
pub use config::AppConfig;
pub use infrastructure::http::HttpServer;
pub use shared::error::{AppError, AppResult};

/// Application result type
pub type Result<T> = std::result::Result<T, shared::error::AppError>;
