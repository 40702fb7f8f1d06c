//! Checkout HTTP handlers

use std::sync::Arc;

use serde::Serialize;
use warp::http::{header, StatusCode};
use warp::reply::Response;
use warp::Reply;

use crate::application::services::checkout_service::{CheckoutCoordinator, CheckoutFailure, CheckoutResult};
use crate::infrastructure::http::models::{
    DeleteRequest, ErrorBody, FinalizeRequestBody, ReceiptRequest, RequestContext, SessionRequest, SESSION_COOKIE,
};
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::shared::error::AppError;
use crate::shared::logging::LoggingUtils;

pub(crate) fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_response(context: &RequestContext, error: &AppError, session_credential: Option<String>) -> Response {
    LoggingUtils::log_rejection(&context.request_id, &context.action, error);
    json_response(&ErrorBody::from_error(error, session_credential), error.http_status_code())
}

fn failure_response(context: &RequestContext, failure: &CheckoutFailure) -> Response {
    LoggingUtils::log_rejection(&context.request_id, &context.action, &failure.error);
    json_response(&ErrorBody::from(failure), failure.error.http_status_code())
}

fn into_response<T: Serialize>(context: &RequestContext, result: CheckoutResult<T>) -> Response {
    match result {
        Ok(body) => json_response(&body, StatusCode::OK),
        Err(failure) => failure_response(context, &failure),
    }
}

/// Rate limit, then require a session cookie
fn admit(
    context: &RequestContext,
    limiter: &RateLimitMiddleware,
    coordinator: &CheckoutCoordinator,
) -> Result<String, Response> {
    if let Err(e) = limiter.check_rate_limit(&context.client_ip, &context.action) {
        coordinator.metrics().record_rejection(&e);
        return Err(error_response(context, &e, None));
    }

    match &context.session_id {
        Some(session_id) => Ok(session_id.clone()),
        None => {
            let error = AppError::InvalidCredential;
            coordinator.metrics().record_rejection(&error);
            Err(error_response(context, &error, None))
        }
    }
}

/// `GET /checkout/params`
pub async fn handle_checkout_params(
    session_id: Option<String>,
    client_ip: String,
    coordinator: Arc<CheckoutCoordinator>,
    limiter: RateLimitMiddleware,
) -> Result<Response, warp::Rejection> {
    let context = RequestContext::new(client_ip, "checkout.params", session_id.clone());
    if let Err(e) = limiter.check_rate_limit(&context.client_ip, &context.action) {
        coordinator.metrics().record_rejection(&e);
        return Ok(error_response(&context, &e, None));
    }

    let params = match coordinator.issue_params(session_id.as_deref()).await {
        Ok(params) => params,
        Err(e) => return Ok(error_response(&context, &e, None)),
    };

    let reply = warp::reply::json(&params);
    if session_id.as_deref() == Some(params.session_id.as_str()) {
        return Ok(reply.into_response());
    }

    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, params.session_id);
    Ok(warp::reply::with_header(reply, header::SET_COOKIE, cookie).into_response())
}

/// `POST /checkout/session`
pub async fn handle_checkout_session(
    body: SessionRequest,
    session_id: Option<String>,
    client_ip: String,
    coordinator: Arc<CheckoutCoordinator>,
    limiter: RateLimitMiddleware,
) -> Result<Response, warp::Rejection> {
    let context = RequestContext::new(client_ip, "checkout.session", session_id);
    let session_id = match admit(&context, &limiter, &coordinator) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let result = coordinator.create_or_update(&session_id, &body.credential, &body.form_data).await;
    Ok(into_response(&context, result))
}

/// `POST /checkout/finalize`
pub async fn handle_checkout_finalize(
    body: FinalizeRequestBody,
    session_id: Option<String>,
    client_ip: String,
    coordinator: Arc<CheckoutCoordinator>,
    limiter: RateLimitMiddleware,
) -> Result<Response, warp::Rejection> {
    let context = RequestContext::new(client_ip, "checkout.finalize", session_id);
    let session_id = match admit(&context, &limiter, &coordinator) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let result = coordinator
        .finalize(&session_id, &body.credential, &body.external_reference, &body.form_data)
        .await;
    Ok(into_response(&context, result))
}

/// `POST /checkout/delete`
pub async fn handle_checkout_delete(
    body: DeleteRequest,
    session_id: Option<String>,
    client_ip: String,
    coordinator: Arc<CheckoutCoordinator>,
    limiter: RateLimitMiddleware,
) -> Result<Response, warp::Rejection> {
    let context = RequestContext::new(client_ip, "checkout.delete", session_id);
    let session_id = match admit(&context, &limiter, &coordinator) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let result = coordinator.delete(&session_id, &body.credential).await;
    Ok(into_response(&context, result))
}

/// `POST /checkout/receipt`
pub async fn handle_checkout_receipt(
    body: ReceiptRequest,
    session_id: Option<String>,
    client_ip: String,
    coordinator: Arc<CheckoutCoordinator>,
    limiter: RateLimitMiddleware,
) -> Result<Response, warp::Rejection> {
    let context = RequestContext::new(client_ip, "checkout.receipt", session_id);
    let session_id = match admit(&context, &limiter, &coordinator) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let result = coordinator.get_receipt(&session_id, &body.credential, &body.reference).await;
    Ok(into_response(&context, result))
}

/// Turn unmatched or malformed requests into the checkout error body
pub async fn handle_rejection(rejection: warp::Rejection) -> Result<Response, std::convert::Infallible> {
    if rejection.is_not_found() {
        return Ok(json_response(
            &serde_json::json!({ "result": "error", "type": "not_found", "messages": ["Not found"] }),
            StatusCode::NOT_FOUND,
        ));
    }
    if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(json_response(
            &serde_json::json!({ "result": "error", "type": "method_not_allowed", "messages": ["Method not allowed"] }),
            StatusCode::METHOD_NOT_ALLOWED,
        ));
    }

    let error = if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        AppError::Json(e.to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        AppError::Json("payload too large".to_string())
    } else if let Some(e) = rejection.find::<AppError>() {
        e.clone()
    } else {
        AppError::Internal(format!("unhandled rejection: {:?}", rejection))
    };

    let context = RequestContext::new("unknown".to_string(), "checkout.reject", None);
    Ok(error_response(&context, &error, None))
}
