//! HTTP utilities - Common filters
//!
//! Filters that inject shared state and resolve per-request identity.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use warp::Filter;

use crate::application::services::checkout_service::CheckoutCoordinator;
use crate::infrastructure::http::models::{resolve_client_ip, session_from_cookie};
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Helper function to inject the checkout coordinator into route
pub fn with_coordinator(
    coordinator: Arc<CheckoutCoordinator>,
) -> impl Filter<Extract = (Arc<CheckoutCoordinator>,), Error = Infallible> + Clone {
    warp::any().map(move || coordinator.clone())
}

/// Helper function to inject the rate limiter into route
pub fn with_rate_limiter(
    limiter: RateLimitMiddleware,
) -> impl Filter<Extract = (RateLimitMiddleware,), Error = Infallible> + Clone {
    warp::any().map(move || limiter.clone())
}

/// Session id from the `checkout_session` cookie, if any
pub fn session_cookie() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::header::optional::<String>("cookie")
        .or(warp::any().map(|| None))
        .unify()
        .map(|header: Option<String>| session_from_cookie(header.as_deref()))
}

/// Client IP from `X-Forwarded-For` when the reverse proxy is trusted, or the peer address
pub fn client_ip(trust_forwarded: bool) -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::header::optional::<String>("x-forwarded-for")
        .or(warp::any().map(|| None))
        .unify()
        .and(warp::addr::remote())
        .map(move |forwarded: Option<String>, remote: Option<SocketAddr>| {
            resolve_client_ip(forwarded.as_deref(), remote, trust_forwarded)
        })
}
