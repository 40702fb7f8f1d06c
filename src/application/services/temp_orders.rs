//! Provisional order lifecycle
//!
//! `NONE -> PENDING -> UPDATED* -> FINALIZED`, with `DELETED` as the alternate
//! terminal state. Every mutation for a session runs under that session's lock,
//! so an update, a finalize and a sweep deletion never interleave on one order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::application::services::discount;
use crate::domain::cart::{Cart, Coupon};
use crate::domain::checkout::CheckoutForm;
use crate::domain::orders::{OrderId, OrderStatus, OrderTag, ProvisionalOrder, TempOrderState};
use crate::infrastructure::adapters::credential_issuer::IssuedCredential;
use crate::infrastructure::adapters::order_store::OrderRepository;
use crate::infrastructure::adapters::session_store::SessionStore;
use crate::shared::error::{AppError, AppResult};
use crate::shared::logging::LoggingUtils;
use crate::shared::metrics::CheckoutMetrics;

pub const NOTE_CREATED: &str = "Temporary order created.";
pub const NOTE_CONVERTED: &str = "Temporary order converted to actual order.";
pub const CREATED_VIA: &str = "checkout";

/// Per-session async locks
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Acquire two sessions' locks in a fixed order
    pub async fn acquire_pair(&self, a: &str, b: &str) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        if a == b {
            return (self.acquire(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let g1 = self.acquire(first).await;
        let g2 = self.acquire(second).await;
        (g1, Some(g2))
    }
}

/// Result of a create/update call
#[derive(Debug, Clone)]
pub struct StagedOrder {
    pub order: ProvisionalOrder,
    pub state: TempOrderState,
    pub finalize_credential: IssuedCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(OrderId),
    /// Nothing live to delete
    Absent,
}

/// Finalization input
pub struct FinalizeRequest<'a> {
    pub session_id: &'a str,
    /// Order id the finalize credential was issued for
    pub credential_order_id: Option<OrderId>,
    pub credential_id: &'a str,
    pub external_reference: &'a str,
    pub form: &'a CheckoutForm,
    pub cart: &'a Cart,
}

pub struct TempOrderLifecycle {
    orders: Arc<dyn OrderRepository>,
    sessions: SessionStore,
    disallowed_update_statuses: Vec<OrderStatus>,
    locks: SessionLocks,
    metrics: CheckoutMetrics,
}

impl TempOrderLifecycle {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        sessions: SessionStore,
        disallowed_update_statuses: Vec<OrderStatus>,
        metrics: CheckoutMetrics,
    ) -> Self {
        Self { orders, sessions, disallowed_update_statuses, locks: SessionLocks::default(), metrics }
    }

    fn record(&self, session_id: &str, order_id: OrderId, transition: &str) {
        LoggingUtils::log_transition(session_id, order_id, transition);
        self.metrics.record_transition(transition);
    }

    /// Create the session's provisional order, or replace the live one's items.
    ///
    /// `issue` produces the finalize credential for the resulting order; its id is
    /// stored on the order so only the latest credential can finalize it.
    pub async fn create_or_update<F>(
        &self,
        session_id: &str,
        cart: &Cart,
        form: &CheckoutForm,
        issue: F,
    ) -> AppResult<StagedOrder>
    where
        F: FnOnce(&ProvisionalOrder) -> AppResult<IssuedCredential>,
    {
        let _guard = self.locks.acquire(session_id).await;

        let existing = match self.sessions.order_awaiting_payment(session_id).await? {
            Some(id) => {
                let order = self.orders.get(id).await?;
                if order.is_none() {
                    debug!(session_id = %session_id, order_id = id, "Marked order no longer exists; creating a new one");
                }
                order
            }
            None => None,
        };

        match existing {
            Some(order) => self.update_locked(order, cart, form, issue).await,
            None => self.create_locked(session_id, cart, form, issue).await,
        }
    }

    async fn create_locked<F>(&self, session_id: &str, cart: &Cart, form: &CheckoutForm, issue: F) -> AppResult<StagedOrder>
    where
        F: FnOnce(&ProvisionalOrder) -> AppResult<IssuedCredential>,
    {
        let mut draft = ProvisionalOrder::draft(session_id, cart, Utc::now());
        stamp_customer(&mut draft, form);
        draft.add_note(NOTE_CREATED);

        let mut order = self.orders.create_temporary(draft).await?;

        let credential = match issue(&order) {
            Ok(credential) => credential,
            Err(e) => {
                self.discard(order.id).await;
                return Err(e);
            }
        };
        order.finalize_credential_id = Some(credential.jti.clone());

        let persisted = async {
            self.orders.save(&order).await?;
            self.sessions.set_order_awaiting_payment(session_id, Some(order.id)).await
        };
        if let Err(e) = persisted.await {
            self.discard(order.id).await;
            return Err(e);
        }

        self.record(session_id, order.id, "created");
        Ok(StagedOrder { state: order.lifecycle_state(), order, finalize_credential: credential })
    }

    /// Remove a half-created order so no tagged draft outlives a failed request
    async fn discard(&self, order_id: OrderId) {
        if let Err(e) = self.orders.delete(order_id).await {
            warn!(order_id, error = %e, "Failed to clean up partially created order");
        }
    }

    async fn update_locked<F>(
        &self,
        mut order: ProvisionalOrder,
        cart: &Cart,
        form: &CheckoutForm,
        issue: F,
    ) -> AppResult<StagedOrder>
    where
        F: FnOnce(&ProvisionalOrder) -> AppResult<IssuedCredential>,
    {
        if !order.is_temporary() {
            return Err(AppError::StateConflict(format!("order {} is no longer temporary", order.id)));
        }
        if self.disallowed_update_statuses.contains(&order.status) {
            return Err(AppError::StateConflict(format!(
                "order {} has status {} and cannot be updated",
                order.id, order.status
            )));
        }

        order.replace_line_items(cart);
        stamp_customer(&mut order, form);
        order.revision += 1;
        order.updated_at = Utc::now();

        let credential = issue(&order)?;
        order.finalize_credential_id = Some(credential.jti.clone());
        self.orders.save(&order).await?;

        self.record(&order.session_id, order.id, "updated");
        Ok(StagedOrder { state: order.lifecycle_state(), order, finalize_credential: credential })
    }

    /// Convert the session's provisional order into a real order, once
    pub async fn finalize(&self, request: FinalizeRequest<'_>) -> AppResult<ProvisionalOrder> {
        let session_id = request.session_id;
        let _guard = self.locks.acquire(session_id).await;

        let marked = self
            .sessions
            .order_awaiting_payment(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no order awaiting payment in session {}", session_id)))?;

        if request.credential_order_id != Some(marked) {
            debug!(session_id = %session_id, marked, "Finalize credential issued for another order");
            return Err(AppError::InvalidCredential);
        }

        let mut order = self
            .orders
            .get(marked)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", marked)))?;

        if order.finalize_credential_id.as_deref() != Some(request.credential_id) {
            debug!(order_id = order.id, "Finalize credential superseded by a later update");
            return Err(AppError::InvalidCredential);
        }
        if !order.lifecycle_state().can_transition_to(TempOrderState::Finalized) {
            return Err(AppError::StateConflict(format!("order {} is not a live provisional order", order.id)));
        }
        if self.disallowed_update_statuses.contains(&order.status) {
            return Err(AppError::StateConflict(format!(
                "order {} has status {} and cannot be finalized",
                order.id, order.status
            )));
        }

        stamp_customer(&mut order, request.form);
        order.created_via = Some(CREATED_VIA.to_string());
        apply_coupons(&mut order, &request.cart.coupons);
        order.tag = Some(OrderTag::Finalized);
        order.finalize_credential_id = None;
        order.external_reference = Some(request.external_reference.to_string());
        order.add_note(format!("External order ID: {}", request.external_reference));
        order.calculate_totals();
        order.add_note(NOTE_CONVERTED);
        order.updated_at = Utc::now();

        self.orders.save(&order).await?;
        self.sessions.set_order_awaiting_payment(session_id, None).await?;

        self.record(session_id, order.id, "finalized");
        Ok(order)
    }

    /// Delete the session's live provisional order; absent is not an error
    pub async fn delete_for_session(&self, session_id: &str) -> AppResult<DeleteOutcome> {
        let _guard = self.locks.acquire(session_id).await;

        let Some(order_id) = self.sessions.order_awaiting_payment(session_id).await? else {
            return Ok(DeleteOutcome::Absent);
        };

        match self.orders.get(order_id).await? {
            Some(order) => self.delete_locked(order).await,
            None => {
                self.sessions.set_order_awaiting_payment(session_id, None).await?;
                Ok(DeleteOutcome::Absent)
            }
        }
    }

    /// Delete an order by id, taking the lock of the session that owns it
    pub async fn delete_order(&self, order_id: OrderId) -> AppResult<DeleteOutcome> {
        let Some(order) = self.orders.get(order_id).await? else {
            return Ok(DeleteOutcome::Absent);
        };
        let mut owner = order.session_id;

        loop {
            let _guard = self.locks.acquire(&owner).await;

            // Re-read under the lock; a concurrent finalize or transfer may have won
            match self.orders.get(order_id).await? {
                None => return Ok(DeleteOutcome::Absent),
                Some(order) if order.session_id == owner => return self.delete_locked(order).await,
                Some(order) => {
                    debug!(order_id, from = %owner, to = %order.session_id, "Order changed sessions; retrying under the new lock");
                    owner = order.session_id;
                }
            }
        }
    }

    async fn delete_locked(&self, order: ProvisionalOrder) -> AppResult<DeleteOutcome> {
        if order.status.blocks_deletion() {
            return Err(AppError::StateConflict(format!(
                "order {} has status {} and cannot be deleted",
                order.id, order.status
            )));
        }
        if !order.is_temporary() {
            return Err(AppError::StateConflict(format!("order {} is not temporary", order.id)));
        }

        self.orders.delete(order.id).await?;
        if self.sessions.order_awaiting_payment(&order.session_id).await? == Some(order.id) {
            self.sessions.set_order_awaiting_payment(&order.session_id, None).await?;
        }

        self.record(&order.session_id, order.id, "deleted");
        Ok(DeleteOutcome::Deleted(order.id))
    }

    /// Move the order marker (and the order's owner) to a new session id
    pub async fn transfer(&self, from: &str, to: &str) -> AppResult<Option<OrderId>> {
        let _guards = self.locks.acquire_pair(from, to).await;

        let session = self.sessions.transfer(from, to).await?;
        if let Some(order_id) = session.order_awaiting_payment {
            if let Some(mut order) = self.orders.get(order_id).await? {
                order.session_id = to.to_string();
                self.orders.save(&order).await?;
            }
        }
        Ok(session.order_awaiting_payment)
    }
}

fn stamp_customer(order: &mut ProvisionalOrder, form: &CheckoutForm) {
    form.apply_billing(&mut order.billing);
    form.apply_shipping(&mut order.shipping);
    if form.customer_note.is_some() {
        order.customer_note = form.customer_note.clone();
    }
    if form.payment_method.is_some() {
        order.payment_method = form.payment_method.clone();
    }
    if form.payment_method_title.is_some() {
        order.payment_method_title = form.payment_method_title.clone();
    }
}

/// Apply the active coupon to the order's discount total
fn apply_coupons(order: &mut ProvisionalOrder, coupons: &[Coupon]) {
    order.calculate_totals();
    let Some(coupon) = coupons.first() else {
        return;
    };
    let discount = match coupon.discount_type.as_str() {
        "percent" => order.subtotal * coupon.amount / Decimal::from(100),
        _ => coupon.amount,
    };
    order.discount_total = discount.max(Decimal::ZERO).min(order.subtotal);
    order.applied_coupons = vec![coupon.code.clone()];

    let base = discount::discountable_total(order.line_items.iter().map(|i| i.subtotal));
    let total_discount = order.discount_total;
    for item in order.line_items.iter_mut().filter(|i| i.subtotal > Decimal::ZERO) {
        item.discount = discount::allocate(total_discount, item.subtotal, base);
    }
}
