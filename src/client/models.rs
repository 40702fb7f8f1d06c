//! Wire models as seen from the storefront side

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::http::models::ErrorBody;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamsReply {
    pub popup_timeout_ms: u64,
    pub session_credential: String,
    pub test_mode: bool,
    pub storefront_path: String,
    pub available: bool,
}

/// Envelope handed to the payment widget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WidgetSession {
    /// Ciphertext string, or the plain payload object in test mode
    pub payload: serde_json::Value,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TempOrderReply {
    pub temp_order_id: u64,
    pub finalize_credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionReply {
    pub result: String,
    pub session: WidgetSession,
    pub temp_order_data: TempOrderReply,
    pub session_credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalizeReply {
    pub result: String,
    pub order_id: u64,
    pub receipt_credential: String,
    pub session_credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteReply {
    pub result: String,
    #[serde(default)]
    pub order_id: Option<u64>,
    pub session_credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptReply {
    pub result: String,
    pub redirect_url: String,
}

/// Client-side failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// The server answered with an error body
    #[error("checkout rejected ({}): {}", .0.kind, .0.messages.join("; "))]
    Rejected(ErrorBody),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("payment gateway is not available")]
    Unavailable,
}

impl ClientError {
    /// Messages to show in the checkout form
    pub fn messages(&self) -> Vec<String> {
        match self {
            ClientError::Rejected(body) if !body.messages.is_empty() => body.messages.clone(),
            ClientError::Unavailable => vec![self.to_string()],
            _ => vec![crate::shared::error::GENERIC_FAILURE_MESSAGE.to_string()],
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Protocol(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
