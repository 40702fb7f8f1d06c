//! HTTP models - Infrastructure concerns
//!
//! Request bodies accepted by the checkout endpoints and the error body they
//! return. Success bodies are the coordinator's response types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::application::services::checkout_service::CheckoutFailure;
use crate::domain::checkout::CheckoutForm;
use crate::shared::error::AppError;

/// Name of the cookie carrying the checkout session id
pub const SESSION_COOKIE: &str = "checkout_session";

/// `POST /checkout/session`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub credential: String,
    #[serde(default)]
    pub form_data: CheckoutForm,
}

/// `POST /checkout/finalize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeRequestBody {
    pub credential: String,
    #[serde(default)]
    pub external_reference: String,
    #[serde(default)]
    pub form_data: CheckoutForm,
}

/// `POST /checkout/delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub credential: String,
}

/// `POST /checkout/receipt`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRequest {
    pub credential: String,
    pub reference: String,
}

/// Error body returned by every checkout endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub result: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub messages: Vec<String>,
    /// The storefront should reload its checkout state before retrying
    pub refresh: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_credential: Option<String>,
}

impl ErrorBody {
    pub fn from_error(error: &AppError, session_credential: Option<String>) -> Self {
        let (result, kind) = match error {
            AppError::CreationBlocked { result, kind, .. } => (result.clone(), kind.clone()),
            other => ("error".to_string(), other.kind().to_string()),
        };
        Self {
            result,
            kind,
            messages: error.client_messages(),
            refresh: error.requires_refresh(),
            session_credential,
        }
    }
}

impl From<&CheckoutFailure> for ErrorBody {
    fn from(failure: &CheckoutFailure) -> Self {
        Self::from_error(&failure.error, failure.session_credential.clone())
    }
}

/// Request context (infrastructure concern)
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
    pub action: String,
    pub session_id: Option<String>,
    pub timestamp: u64,
}

impl RequestContext {
    pub fn new(client_ip: String, action: &str, session_id: Option<String>) -> Self {
        Self {
            request_id: crate::shared::logging::LoggingUtils::generate_request_id(),
            client_ip,
            action: action.to_string(),
            session_id,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

/// Extract the checkout session id from a raw `Cookie` header
pub fn session_from_cookie(header: Option<&str>) -> Option<String> {
    header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolve the client IP: the first `X-Forwarded-For` hop when the proxy is trusted, else the peer
pub fn resolve_client_ip(
    forwarded_for: Option<&str>,
    remote: Option<std::net::SocketAddr>,
    trust_forwarded: bool,
) -> String {
    forwarded_for
        .filter(|_| trust_forwarded)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .and_then(|ip| ip.parse::<std::net::IpAddr>().ok())
        .or_else(|| remote.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
