//! Pluggable extension points called by the checkout coordinator

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::services::checkout_service::SessionResponse;
use crate::domain::cart::{Cart, CartLine, Coupon};
use crate::domain::checkout::{CheckoutForm, CheckoutSession, CreationDecision};
use crate::domain::orders::ProvisionalOrder;
use crate::infrastructure::adapters::checkout_validator::FieldCheckoutValidator;
use crate::shared::error::AppResult;

/// May veto provisional order creation
pub trait CreationGuard: Send + Sync {
    fn check(&self, session: &CheckoutSession, cart: &Cart) -> CreationDecision;
}

/// Adjusts the unit price of each payload item
pub trait ItemPriceTransform: Send + Sync {
    fn transform(&self, line: &CartLine, price: Decimal) -> Decimal;
}

/// Adjusts the coupon amount before it is allocated across items
pub trait CouponAmountTransform: Send + Sync {
    fn transform(&self, coupon: &Coupon, amount: Decimal) -> Decimal;
}

/// Last chance to modify a create/update response
pub trait ResponseDecorator: Send + Sync {
    fn decorate(&self, response: SessionResponse) -> SessionResponse;
}

/// Validates submitted checkout fields; errors carry user-facing messages
pub trait CheckoutValidator: Send + Sync {
    fn validate(&self, form: &CheckoutForm, cart: &Cart) -> AppResult<()>;
}

/// Notified after an order has been finalized
#[async_trait]
pub trait FinalizeObserver: Send + Sync {
    async fn on_finalized(&self, order: &ProvisionalOrder);
}

pub struct AllowAll;

impl CreationGuard for AllowAll {
    fn check(&self, _session: &CheckoutSession, _cart: &Cart) -> CreationDecision {
        CreationDecision::Allow
    }
}

pub struct Identity;

impl ItemPriceTransform for Identity {
    fn transform(&self, _line: &CartLine, price: Decimal) -> Decimal {
        price
    }
}

impl CouponAmountTransform for Identity {
    fn transform(&self, _coupon: &Coupon, amount: Decimal) -> Decimal {
        amount
    }
}

impl ResponseDecorator for Identity {
    fn decorate(&self, response: SessionResponse) -> SessionResponse {
        response
    }
}

pub struct NoopObserver;

#[async_trait]
impl FinalizeObserver for NoopObserver {
    async fn on_finalized(&self, _order: &ProvisionalOrder) {}
}

/// Set of extension implementations handed to the coordinator
#[derive(Clone)]
pub struct CheckoutExtensions {
    pub creation_guard: Arc<dyn CreationGuard>,
    pub item_price: Arc<dyn ItemPriceTransform>,
    pub coupon_amount: Arc<dyn CouponAmountTransform>,
    pub response: Arc<dyn ResponseDecorator>,
    pub validator: Arc<dyn CheckoutValidator>,
    pub finalize_observer: Arc<dyn FinalizeObserver>,
}

impl CheckoutExtensions {
    /// Defaults: allow every creation, identity transforms, field validation for `gateway_id`
    pub fn new(gateway_id: &str) -> Self {
        Self {
            creation_guard: Arc::new(AllowAll),
            item_price: Arc::new(Identity),
            coupon_amount: Arc::new(Identity),
            response: Arc::new(Identity),
            validator: Arc::new(FieldCheckoutValidator::new(gateway_id)),
            finalize_observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_creation_guard(mut self, guard: Arc<dyn CreationGuard>) -> Self {
        self.creation_guard = guard;
        self
    }

    pub fn with_item_price(mut self, transform: Arc<dyn ItemPriceTransform>) -> Self {
        self.item_price = transform;
        self
    }

    pub fn with_coupon_amount(mut self, transform: Arc<dyn CouponAmountTransform>) -> Self {
        self.coupon_amount = transform;
        self
    }

    pub fn with_response_decorator(mut self, decorator: Arc<dyn ResponseDecorator>) -> Self {
        self.response = decorator;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn CheckoutValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_finalize_observer(mut self, observer: Arc<dyn FinalizeObserver>) -> Self {
        self.finalize_observer = observer;
        self
    }
}
