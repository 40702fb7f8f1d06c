//! Storefront checkout flow
//!
//! Drives one checkout attempt: submit the form, open the payment widget with
//! the sealed session, finalize once the widget reports a payment reference,
//! then move to the receipt page. A popup timer mirrors the server-side
//! provisional order lifetime and reloads the page when it runs out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::models::{
    ClientError, ClientResult, DeleteReply, FinalizeReply, ParamsReply, ReceiptReply, SessionReply, WidgetSession,
};
use crate::domain::checkout::CheckoutForm;
use crate::shared::validation::DEFAULT_TEMP_ORDER_TIMEOUT_SECS;

/// Checkout endpoints as seen by the storefront
#[async_trait]
pub trait CheckoutApi: Send + Sync {
    async fn params(&self) -> ClientResult<ParamsReply>;
    async fn create_session(&self, credential: &str, form: &CheckoutForm) -> ClientResult<SessionReply>;
    async fn finalize(&self, credential: &str, reference: &str, form: &CheckoutForm) -> ClientResult<FinalizeReply>;
    async fn delete(&self, credential: &str) -> ClientResult<DeleteReply>;
    async fn receipt(&self, credential: &str, reference: &str) -> ClientResult<ReceiptReply>;
}

/// Hosted payment widget
pub trait PaymentWidget: Send + Sync {
    /// Open the widget with a sealed session
    fn launch(&self, session: &WidgetSession) -> ClientResult<()>;
}

/// Checkout page
pub trait CheckoutUi: Send + Sync {
    fn set_busy(&self, busy: bool);
    fn show_errors(&self, messages: &[String]);
    /// Re-render the checkout so fresh totals and credentials are picked up
    fn refresh_checkout(&self);
    fn reload(&self);
    fn navigate(&self, url: &str);

    fn notify_timeout(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Submitting,
    AwaitingPayment { order_id: u64 },
    Finalizing,
    Completed { redirect_url: String },
}

/// Cancellable delayed task; dropping the timer cancels it
#[derive(Debug)]
pub struct PopupTimer {
    handle: JoinHandle<()>,
}

impl PopupTimer {
    pub fn arm<F>(timeout: Duration, on_expire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_expire.await;
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PopupTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct FlowInner {
    state: FlowState,
    session_credential: Option<String>,
    finalize_credential: Option<String>,
    popup_timeout: Duration,
    form: Option<CheckoutForm>,
    timer: Option<PopupTimer>,
}

pub struct CheckoutFlowController {
    api: Arc<dyn CheckoutApi>,
    widget: Arc<dyn PaymentWidget>,
    ui: Arc<dyn CheckoutUi>,
    inner: Arc<Mutex<FlowInner>>,
}

impl CheckoutFlowController {
    pub fn new(api: Arc<dyn CheckoutApi>, widget: Arc<dyn PaymentWidget>, ui: Arc<dyn CheckoutUi>) -> Self {
        Self {
            api,
            widget,
            ui,
            inner: Arc::new(Mutex::new(FlowInner {
                state: FlowState::Idle,
                session_credential: None,
                finalize_credential: None,
                popup_timeout: Duration::from_secs(DEFAULT_TEMP_ORDER_TIMEOUT_SECS),
                form: None,
                timer: None,
            })),
        }
    }

    pub async fn state(&self) -> FlowState {
        self.inner.lock().await.state.clone()
    }

    pub async fn popup_timeout(&self) -> Duration {
        self.inner.lock().await.popup_timeout
    }

    /// Fetch checkout parameters and the first session credential
    pub async fn bootstrap(&self) -> ClientResult<ParamsReply> {
        let params = self.api.params().await?;

        let mut inner = self.inner.lock().await;
        inner.session_credential = Some(params.session_credential.clone());
        if params.popup_timeout_ms > 0 {
            inner.popup_timeout = Duration::from_millis(params.popup_timeout_ms);
        }
        drop(inner);

        if !params.available {
            return Err(ClientError::Unavailable);
        }
        Ok(params)
    }

    async fn session_credential(&self) -> ClientResult<String> {
        if let Some(credential) = self.inner.lock().await.session_credential.clone() {
            return Ok(credential);
        }
        Ok(self.bootstrap().await?.session_credential)
    }

    /// Submit the checkout form; returns `false` when a checkout is already in flight
    pub async fn submit(&self, form: CheckoutForm) -> ClientResult<bool> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != FlowState::Idle {
                debug!(state = ?inner.state, "Ignoring checkout submission while another is in flight");
                return Ok(false);
            }
            inner.state = FlowState::Submitting;
        }
        self.ui.set_busy(true);

        let credential = match self.session_credential().await {
            Ok(credential) => credential,
            Err(e) => return self.fail(e).await,
        };
        let reply = match self.api.create_session(&credential, &form).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(e).await,
        };

        let mut inner = self.inner.lock().await;
        inner.session_credential = Some(reply.session_credential);
        if let Err(e) = self.widget.launch(&reply.session) {
            drop(inner);
            return self.fail(e).await;
        }

        let order_id = reply.temp_order_data.temp_order_id;
        inner.finalize_credential = Some(reply.temp_order_data.finalize_credential);
        inner.form = Some(form);
        inner.timer = Some(self.arm_timer(inner.popup_timeout));
        inner.state = FlowState::AwaitingPayment { order_id };
        drop(inner);

        info!(order_id, "Payment widget launched");
        self.ui.set_busy(false);
        Ok(true)
    }

    fn arm_timer(&self, timeout: Duration) -> PopupTimer {
        let inner = self.inner.clone();
        let ui = self.ui.clone();
        PopupTimer::arm(timeout, async move {
            let mut guard = inner.lock().await;
            if !matches!(guard.state, FlowState::AwaitingPayment { .. }) {
                return;
            }
            guard.state = FlowState::Idle;
            guard.finalize_credential = None;
            drop(guard);

            warn!("Payment popup timed out; reloading checkout");
            ui.notify_timeout();
            ui.reload();
        })
    }

    /// Widget closed; `reference` is present only after a completed payment
    pub async fn on_widget_closed(&self, reference: Option<String>) -> ClientResult<()> {
        let (credential, reference, form) = {
            let mut inner = self.inner.lock().await;
            if let Some(timer) = inner.timer.take() {
                timer.cancel();
            }
            if !matches!(inner.state, FlowState::AwaitingPayment { .. }) {
                debug!(state = ?inner.state, "Widget closed outside of a pending payment");
                return Ok(());
            }

            let Some(reference) = reference.filter(|r| !r.trim().is_empty()) else {
                inner.state = FlowState::Idle;
                inner.finalize_credential = None;
                return Ok(());
            };
            let Some(credential) = inner.finalize_credential.take() else {
                inner.state = FlowState::Idle;
                return Err(ClientError::Protocol("no finalize credential for pending payment".to_string()));
            };

            inner.state = FlowState::Finalizing;
            (credential, reference, inner.form.clone().unwrap_or_default())
        };
        self.ui.set_busy(true);

        let finalized = match self.api.finalize(&credential, &reference, &form).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(e).await.map(|_| ()),
        };
        self.inner.lock().await.session_credential = Some(finalized.session_credential);

        let receipt = match self.api.receipt(&finalized.receipt_credential, &reference).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(e).await.map(|_| ()),
        };

        {
            let mut inner = self.inner.lock().await;
            inner.state = FlowState::Completed { redirect_url: receipt.redirect_url.clone() };
            inner.form = None;
        }
        info!(order_id = finalized.order_id, "Checkout completed");
        self.ui.navigate(&receipt.redirect_url);
        Ok(())
    }

    /// Explicitly abandon the pending checkout
    pub async fn abandon(&self) -> ClientResult<Option<u64>> {
        let credential = self.session_credential().await?;
        let reply = match self.api.delete(&credential).await {
            Ok(reply) => reply,
            Err(e) => {
                self.fail(e.clone()).await.ok();
                return Err(e);
            }
        };

        let mut inner = self.inner.lock().await;
        inner.timer = None;
        inner.state = FlowState::Idle;
        inner.finalize_credential = None;
        inner.session_credential = Some(reply.session_credential);
        Ok(reply.order_id)
    }

    async fn fail(&self, error: ClientError) -> ClientResult<bool> {
        let refresh = {
            let mut inner = self.inner.lock().await;
            inner.state = FlowState::Idle;
            inner.timer = None;
            match &error {
                ClientError::Rejected(body) => {
                    if let Some(credential) = &body.session_credential {
                        inner.session_credential = Some(credential.clone());
                    }
                    body.refresh
                }
                _ => false,
            }
        };

        warn!(error = %error, "Checkout step failed");
        if refresh {
            self.ui.refresh_checkout();
        }
        self.ui.show_errors(&error.messages());
        self.ui.set_busy(false);
        Err(error)
    }
}
