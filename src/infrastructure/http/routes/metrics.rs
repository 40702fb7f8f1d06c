//! Metrics routes module

use std::sync::Arc;

use warp::Filter;

use crate::application::services::checkout_service::CheckoutCoordinator;
use crate::infrastructure::http::handlers::handle_prometheus_request;
use crate::infrastructure::http::utils::with_coordinator;

/// Metrics routes configuration
pub struct MetricsRoutes;

impl MetricsRoutes {
    /// Create the Prometheus metrics endpoint route
    pub fn create_prometheus_route(
        coordinator: Arc<CheckoutCoordinator>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_coordinator(coordinator))
            .and_then(handle_prometheus_request)
    }
}
