//! HTTP routes module

pub mod builder;
pub mod checkout;
pub mod health;
pub mod metrics;

pub use builder::RouteBuilder;
pub use checkout::CheckoutRoutes;
pub use health::HealthRoutes;
pub use metrics::MetricsRoutes;
