//! Single-use checkout credentials
//!
//! Credentials are HS256 JWTs bound to a checkout session and a scope. Each one
//! may be verified exactly once: verification consumes its `jti` in the
//! [`CredentialLedger`]. Every failure cause maps to the same
//! [`AppError::InvalidCredential`]; the cause is only logged at debug level.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::app_config::CredentialConfig;
use crate::domain::orders::OrderId;
use crate::infrastructure::adapters::credential_ledger::CredentialLedger;
use crate::shared::error::{AppError, AppResult};

/// Clock skew tolerated when checking `exp` and `nbf`
const LEEWAY_SECONDS: u64 = 30;

/// Step a credential authorizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScope {
    /// Create/update a provisional order, or delete it
    Session,
    /// Finalize one provisional order
    Finalize,
    /// Resolve the receipt URL of a finalized order
    Receipt,
}

impl CredentialScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialScope::Session => "session",
            CredentialScope::Finalize => "finalize",
            CredentialScope::Receipt => "receipt",
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialClaims {
    /// Checkout session id
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
    pub nbf: usize,
    pub jti: String,
    pub scope: CredentialScope,
    /// Provisional order the credential is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CredentialIssuer {
    config: CredentialConfig,
    ledger: CredentialLedger,
    finalize_lifetime_seconds: u64,
}

impl CredentialIssuer {
    /// `finalize_lifetime_seconds` should cover the whole payment popup window
    pub fn new(config: CredentialConfig, ledger: CredentialLedger, finalize_lifetime_seconds: u64) -> Self {
        Self { config, ledger, finalize_lifetime_seconds }
    }

    fn lifetime(&self, scope: CredentialScope) -> u64 {
        match scope {
            CredentialScope::Finalize => self.finalize_lifetime_seconds.max(self.config.expiration_seconds),
            _ => self.config.expiration_seconds,
        }
    }

    pub fn issue(&self, session_id: &str, scope: CredentialScope, order_id: Option<OrderId>) -> AppResult<IssuedCredential> {
        let now = Utc::now();
        let lifetime = self.lifetime(scope);
        let expires_at = i64::try_from(lifetime)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AppError::Internal(format!("credential lifetime out of range: {}s", lifetime)))?;
        let claims = CredentialClaims {
            sub: session_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
            nbf: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            scope,
            order_id,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret_key.as_bytes()),
        )?;

        Ok(IssuedCredential { token, jti: claims.jti, expires_at })
    }

    /// Signature, issuer, audience and time checks only; does not consume
    pub fn decode(&self, token: &str) -> AppResult<CredentialClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECONDS;

        decode::<CredentialClaims>(token, &DecodingKey::from_secret(self.config.secret_key.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Credential rejected");
                AppError::InvalidCredential
            })
    }

    /// Decode, check scope and session binding, then consume the credential
    pub async fn verify(&self, token: &str, scope: CredentialScope, session_id: &str) -> AppResult<CredentialClaims> {
        let claims = self.decode(token)?;

        if claims.scope != scope {
            debug!(expected = scope.as_str(), actual = claims.scope.as_str(), "Credential scope mismatch");
            return Err(AppError::InvalidCredential);
        }
        if claims.sub != session_id {
            debug!("Credential bound to a different session");
            return Err(AppError::InvalidCredential);
        }

        let remaining = (claims.exp as i64 - Utc::now().timestamp()).max(0) as u64 + LEEWAY_SECONDS;
        if !self.ledger.consume(&claims.jti, remaining).await? {
            debug!(jti = %claims.jti, "Credential replayed");
            return Err(AppError::InvalidCredential);
        }

        Ok(claims)
    }
}
