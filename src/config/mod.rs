//! Configuration management module
//!
//! This module handles loading and validating application settings.

pub mod app_config;
pub mod validation;

pub use app_config::{AppConfig, GatewayConfig};
pub use validation::ConfigValidator;
