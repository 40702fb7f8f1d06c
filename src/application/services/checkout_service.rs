//! Checkout session coordinator
//!
//! Request-level orchestration: credential verification, validation, the temp
//! order lifecycle, payload building and sealing. Each public operation returns
//! a [`CheckoutFailure`] on error, which carries a fresh session credential so
//! the storefront can retry without reloading.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::services::encryption::PayloadSealer;
use crate::application::services::expiry_scheduler::ExpiryScheduler;
use crate::application::services::extensions::CheckoutExtensions;
use crate::application::services::payload_builder::PayloadBuilder;
use crate::application::services::temp_orders::{DeleteOutcome, FinalizeRequest, TempOrderLifecycle};
use crate::config::{AppConfig, ConfigValidator, GatewayConfig};
use crate::domain::checkout::{CheckoutForm, CreationDecision};
use crate::domain::orders::{OrderId, OrderTag};
use crate::domain::payload::SealedSession;
use crate::infrastructure::adapters::cart_store::CartStore;
use crate::infrastructure::adapters::credential_issuer::{CredentialIssuer, CredentialScope};
use crate::infrastructure::adapters::credential_ledger::CredentialLedger;
use crate::infrastructure::adapters::order_store::OrderRepository;
use crate::infrastructure::adapters::session_store::SessionStore;
use crate::shared::error::{AppError, AppResult};
use crate::shared::metrics::CheckoutMetrics;

const RESULT_SUCCESS: &str = "success";

/// Storefront bootstrap values
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutParams {
    #[serde(skip)]
    pub session_id: String,
    pub popup_timeout_ms: u64,
    pub session_credential: String,
    pub test_mode: bool,
    pub storefront_path: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TempOrderData {
    pub temp_order_id: OrderId,
    /// Single-use credential for the finalize call
    pub finalize_credential: String,
}

/// Create/update response
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionResponse {
    pub result: String,
    pub session: SealedSession,
    pub temp_order_data: TempOrderData,
    pub session_credential: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FinalizeResponse {
    pub result: String,
    pub order_id: OrderId,
    pub receipt_credential: String,
    pub session_credential: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeleteResponse {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub session_credential: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReceiptResponse {
    pub result: String,
    pub redirect_url: String,
}

/// Failed checkout operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct CheckoutFailure {
    pub error: AppError,
    /// Replacement session credential, when one could be issued
    pub session_credential: Option<String>,
}

pub type CheckoutResult<T> = Result<T, CheckoutFailure>;

/// Collaborators injected into the coordinator
#[derive(Clone)]
pub struct CheckoutDependencies {
    pub orders: Arc<dyn OrderRepository>,
    pub carts: Arc<dyn CartStore>,
    pub sessions: SessionStore,
    pub ledger: CredentialLedger,
    pub metrics: CheckoutMetrics,
}

pub struct CheckoutCoordinator {
    gateway: GatewayConfig,
    available: bool,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderRepository>,
    sessions: SessionStore,
    lifecycle: Arc<TempOrderLifecycle>,
    scheduler: ExpiryScheduler,
    builder: PayloadBuilder,
    sealer: Option<PayloadSealer>,
    credentials: CredentialIssuer,
    extensions: CheckoutExtensions,
    metrics: CheckoutMetrics,
}

impl CheckoutCoordinator {
    pub fn new(config: &AppConfig, deps: CheckoutDependencies, extensions: CheckoutExtensions) -> AppResult<Self> {
        let gateway = config.gateway.clone();
        let available = ConfigValidator::gateway_available(&gateway);
        let sealer = if available {
            Some(PayloadSealer::new(&gateway.private_key, gateway.test_mode)?)
        } else {
            warn!(gateway = %gateway.gateway_id, "Payment gateway is not available; checkout endpoints will refuse requests");
            None
        };

        let lifecycle = Arc::new(TempOrderLifecycle::new(
            deps.orders.clone(),
            deps.sessions.clone(),
            gateway.disallowed_statuses(),
            deps.metrics.clone(),
        ));
        let scheduler = ExpiryScheduler::new(lifecycle.clone(), deps.orders.clone(), deps.metrics.clone());
        let credentials = CredentialIssuer::new(
            config.credentials.clone(),
            deps.ledger,
            gateway.temp_order_timeout().as_secs(),
        );

        Ok(Self {
            builder: PayloadBuilder::new(&gateway, &extensions),
            gateway,
            available,
            carts: deps.carts,
            orders: deps.orders,
            sessions: deps.sessions,
            lifecycle,
            scheduler,
            sealer,
            credentials,
            extensions,
            metrics: deps.metrics,
        })
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn lifecycle(&self) -> Arc<TempOrderLifecycle> {
        self.lifecycle.clone()
    }

    pub fn scheduler(&self) -> &ExpiryScheduler {
        &self.scheduler
    }

    pub fn credentials(&self) -> &CredentialIssuer {
        &self.credentials
    }

    pub fn metrics(&self) -> &CheckoutMetrics {
        &self.metrics
    }

    /// Install the expiry sweep for the configured threshold
    pub async fn start_expiry_sweep(&self) {
        self.scheduler.install(self.gateway.temp_order_timeout()).await;
    }

    fn ensure_available(&self) -> AppResult<&PayloadSealer> {
        self.sealer.as_ref().filter(|_| self.available).ok_or(AppError::GatewayUnavailable)
    }

    fn issue_session_credential(&self, session_id: &str) -> AppResult<String> {
        Ok(self.credentials.issue(session_id, CredentialScope::Session, None)?.token)
    }

    fn fail(&self, session_id: &str, error: AppError) -> CheckoutFailure {
        self.metrics.record_rejection(&error);
        let session_credential = match error {
            AppError::GatewayUnavailable | AppError::RateLimit => None,
            _ => self.issue_session_credential(session_id).ok(),
        };
        CheckoutFailure { error, session_credential }
    }

    /// Bootstrap values for the storefront, creating the session when needed
    #[instrument(skip(self))]
    pub async fn issue_params(&self, session_id: Option<&str>) -> AppResult<CheckoutParams> {
        let session_id = match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };
        self.sessions.get_or_create(&session_id).await?;

        Ok(CheckoutParams {
            popup_timeout_ms: self.gateway.popup_timeout_ms(),
            session_credential: self.issue_session_credential(&session_id)?,
            test_mode: self.gateway.test_mode,
            storefront_path: self.gateway.storefront(),
            available: self.available,
            session_id,
        })
    }

    /// Create or update the session's provisional order and return a sealed payload
    #[instrument(skip(self, credential, form), fields(session_id = %session_id))]
    pub async fn create_or_update(
        &self,
        session_id: &str,
        credential: &str,
        form: &CheckoutForm,
    ) -> CheckoutResult<SessionResponse> {
        self.create_or_update_inner(session_id, credential, form)
            .await
            .map_err(|e| self.fail(session_id, e))
    }

    async fn create_or_update_inner(
        &self,
        session_id: &str,
        credential: &str,
        form: &CheckoutForm,
    ) -> AppResult<SessionResponse> {
        let sealer = self.ensure_available()?;
        self.credentials.verify(credential, CredentialScope::Session, session_id).await?;

        let cart = self.carts.cart(session_id).await?;
        self.extensions.validator.validate(form, &cart)?;
        if cart.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let session = self.sessions.get_or_create(session_id).await?;
        if let CreationDecision::Deny { result, kind, message } = self.extensions.creation_guard.check(&session, &cart) {
            return Err(AppError::CreationBlocked { result, kind, message });
        }

        let staged = self
            .lifecycle
            .create_or_update(session_id, &cart, form, |order| {
                self.credentials.issue(session_id, CredentialScope::Finalize, Some(order.id))
            })
            .await?;

        let payload = self.builder.build(&cart, Some(&staged.order));
        let sealed = sealer.seal(payload)?;

        let response = SessionResponse {
            result: RESULT_SUCCESS.to_string(),
            session: sealed,
            temp_order_data: TempOrderData {
                temp_order_id: staged.order.id,
                finalize_credential: staged.finalize_credential.token,
            },
            session_credential: self.issue_session_credential(session_id)?,
        };
        Ok(self.extensions.response.decorate(response))
    }

    /// Finalize the session's provisional order after a confirmed external payment
    #[instrument(skip(self, credential, form), fields(session_id = %session_id))]
    pub async fn finalize(
        &self,
        session_id: &str,
        credential: &str,
        external_reference: &str,
        form: &CheckoutForm,
    ) -> CheckoutResult<FinalizeResponse> {
        self.finalize_inner(session_id, credential, external_reference, form)
            .await
            .map_err(|e| self.fail(session_id, e))
    }

    async fn finalize_inner(
        &self,
        session_id: &str,
        credential: &str,
        external_reference: &str,
        form: &CheckoutForm,
    ) -> AppResult<FinalizeResponse> {
        self.ensure_available()?;
        let external_reference = external_reference.trim();
        if external_reference.is_empty() {
            return Err(AppError::Validation(vec!["Missing payment reference".to_string()]));
        }

        let claims = self.credentials.verify(credential, CredentialScope::Finalize, session_id).await?;
        let cart = self.carts.cart(session_id).await?;

        let order = self
            .lifecycle
            .finalize(FinalizeRequest {
                session_id,
                credential_order_id: claims.order_id,
                credential_id: &claims.jti,
                external_reference,
                form,
                cart: &cart,
            })
            .await?;

        self.extensions.finalize_observer.on_finalized(&order).await;
        if let Err(e) = self.carts.empty(session_id).await {
            warn!(order_id = order.id, error = %e, "Failed to empty cart after finalize");
        }
        info!(order_id = order.id, external_reference = %external_reference, "Checkout finalized");

        Ok(FinalizeResponse {
            result: RESULT_SUCCESS.to_string(),
            order_id: order.id,
            receipt_credential: self.credentials.issue(session_id, CredentialScope::Receipt, Some(order.id))?.token,
            session_credential: self.issue_session_credential(session_id)?,
        })
    }

    /// Abandon the session's provisional order; a no-op when there is none
    #[instrument(skip(self, credential), fields(session_id = %session_id))]
    pub async fn delete(&self, session_id: &str, credential: &str) -> CheckoutResult<DeleteResponse> {
        self.delete_inner(session_id, credential).await.map_err(|e| self.fail(session_id, e))
    }

    async fn delete_inner(&self, session_id: &str, credential: &str) -> AppResult<DeleteResponse> {
        self.ensure_available()?;
        self.credentials.verify(credential, CredentialScope::Session, session_id).await?;

        let order_id = match self.lifecycle.delete_for_session(session_id).await? {
            DeleteOutcome::Deleted(id) => Some(id),
            DeleteOutcome::Absent => None,
        };

        Ok(DeleteResponse {
            result: RESULT_SUCCESS.to_string(),
            order_id,
            session_credential: self.issue_session_credential(session_id)?,
        })
    }

    /// Resolve the receipt page of a finalized order
    #[instrument(skip(self, credential), fields(session_id = %session_id))]
    pub async fn get_receipt(&self, session_id: &str, credential: &str, reference: &str) -> CheckoutResult<ReceiptResponse> {
        self.get_receipt_inner(session_id, credential, reference)
            .await
            .map_err(|e| self.fail(session_id, e))
    }

    async fn get_receipt_inner(&self, session_id: &str, credential: &str, reference: &str) -> AppResult<ReceiptResponse> {
        let claims = self.credentials.verify(credential, CredentialScope::Receipt, session_id).await?;
        let order_id = claims.order_id.ok_or(AppError::InvalidCredential)?;

        let order = self.orders.get(order_id).await?.ok_or(AppError::InvalidCredential)?;
        if order.tag != Some(OrderTag::Finalized) || order.external_reference.as_deref() != Some(reference.trim()) {
            return Err(AppError::InvalidCredential);
        }

        Ok(ReceiptResponse {
            result: RESULT_SUCCESS.to_string(),
            redirect_url: self.gateway.receipt_url(order.id),
        })
    }

    /// Cart-emptied signal: drop the session's provisional order
    pub async fn on_cart_emptied(&self, session_id: &str) -> AppResult<DeleteOutcome> {
        self.lifecycle.delete_for_session(session_id).await
    }

    /// Hand the checkout over to a new session id after login or account creation
    pub async fn transfer_session(&self, from: &str, to: &str) -> AppResult<Option<OrderId>> {
        self.carts.transfer(from, to).await?;
        self.lifecycle.transfer(from, to).await
    }
}
