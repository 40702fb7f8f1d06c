//! Checkout routes

use std::sync::Arc;

use warp::Filter;

use crate::application::services::checkout_service::CheckoutCoordinator;
use crate::config::AppConfig;
use crate::infrastructure::http::handlers::{
    handle_checkout_delete, handle_checkout_finalize, handle_checkout_params, handle_checkout_receipt,
    handle_checkout_session,
};
use crate::infrastructure::http::utils::{client_ip, session_cookie, with_coordinator, with_rate_limiter};
use crate::middleware::rate_limit::RateLimitMiddleware;

pub struct CheckoutRoutes;

impl CheckoutRoutes {
    pub fn create_routes(
        config: &AppConfig,
        coordinator: Arc<CheckoutCoordinator>,
        limiter: RateLimitMiddleware,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let limit = config.server.max_request_size as u64;
        let trust_forwarded = config.server.trusts_forwarded_for();

        let params = warp::path!("checkout" / "params")
            .and(warp::get())
            .and(session_cookie())
            .and(client_ip(trust_forwarded))
            .and(with_coordinator(coordinator.clone()))
            .and(with_rate_limiter(limiter.clone()))
            .and_then(handle_checkout_params);

        let session = warp::path!("checkout" / "session")
            .and(warp::post())
            .and(warp::body::content_length_limit(limit))
            .and(warp::body::json())
            .and(session_cookie())
            .and(client_ip(trust_forwarded))
            .and(with_coordinator(coordinator.clone()))
            .and(with_rate_limiter(limiter.clone()))
            .and_then(handle_checkout_session);

        let finalize = warp::path!("checkout" / "finalize")
            .and(warp::post())
            .and(warp::body::content_length_limit(limit))
            .and(warp::body::json())
            .and(session_cookie())
            .and(client_ip(trust_forwarded))
            .and(with_coordinator(coordinator.clone()))
            .and(with_rate_limiter(limiter.clone()))
            .and_then(handle_checkout_finalize);

        let delete = warp::path!("checkout" / "delete")
            .and(warp::post())
            .and(warp::body::content_length_limit(limit))
            .and(warp::body::json())
            .and(session_cookie())
            .and(client_ip(trust_forwarded))
            .and(with_coordinator(coordinator.clone()))
            .and(with_rate_limiter(limiter.clone()))
            .and_then(handle_checkout_delete);

        let receipt = warp::path!("checkout" / "receipt")
            .and(warp::post())
            .and(warp::body::content_length_limit(limit))
            .and(warp::body::json())
            .and(session_cookie())
            .and(client_ip(trust_forwarded))
            .and(with_coordinator(coordinator))
            .and(with_rate_limiter(limiter))
            .and_then(handle_checkout_receipt);

        params.or(session).or(finalize).or(delete).or(receipt)
    }
}
