//! Health routes module

use std::sync::Arc;

use warp::Filter;

use crate::application::services::checkout_service::CheckoutCoordinator;
use crate::infrastructure::http::handlers::handle_health_request;
use crate::infrastructure::http::utils::with_coordinator;

/// Health routes configuration
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check endpoint route
    pub fn create_health_route(
        coordinator: Arc<CheckoutCoordinator>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_coordinator(coordinator))
            .and_then(handle_health_request)
    }
}
