//! Route builder module
//!
//! Assembles every route group into the application filter.

use std::sync::Arc;

use warp::Filter;

use crate::application::services::checkout_service::CheckoutCoordinator;
use crate::config::AppConfig;
use crate::infrastructure::http::handlers::handle_rejection;
use crate::infrastructure::http::routes::{CheckoutRoutes, HealthRoutes, MetricsRoutes};
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Route builder that orchestrates the creation of all application routes
pub struct RouteBuilder;

impl RouteBuilder {
    /// Build all application routes
    pub fn build_routes(
        config: &AppConfig,
        coordinator: Arc<CheckoutCoordinator>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        let limiter = RateLimitMiddleware::new(&config.rate_limit);

        let checkout = CheckoutRoutes::create_routes(config, coordinator.clone(), limiter);
        let health = HealthRoutes::create_health_route(coordinator.clone());
        let metrics = MetricsRoutes::create_prometheus_route(coordinator);

        checkout
            .or(health)
            .or(metrics)
            .recover(handle_rejection)
    }
}
