//! Metrics handler module

use std::sync::Arc;

use warp::http::StatusCode;
use warp::Reply;

use crate::application::services::checkout_service::CheckoutCoordinator;

/// Handle Prometheus metrics requests
pub async fn handle_prometheus_request(coordinator: Arc<CheckoutCoordinator>) -> Result<impl Reply, warp::Rejection> {
    let (body, status) = match coordinator.metrics().render() {
        Ok(text) => (text, StatusCode::OK),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            (String::new(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    Ok(warp::reply::with_header(
        warp::reply::with_status(body, status),
        "Content-Type",
        "text/plain; version=0.0.4; charset=utf-8",
    ))
}
