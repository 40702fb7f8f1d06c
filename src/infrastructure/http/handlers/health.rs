//! Health check handler module

use std::sync::Arc;

use serde::Serialize;
use warp::Reply;

use crate::application::services::checkout_service::CheckoutCoordinator;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    gateway_available: bool,
    version: &'static str,
    timestamp: String,
}

/// Handle health check requests
pub async fn handle_health_request(coordinator: Arc<CheckoutCoordinator>) -> Result<impl Reply, warp::Rejection> {
    let available = coordinator.is_available();
    let body = HealthBody {
        status: if available { "healthy" } else { "degraded" },
        gateway_available: available,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Ok(warp::reply::json(&body))
}
