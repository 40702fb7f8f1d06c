//! Domain layer - Core checkout models and lifecycle rules
//!
//! This module contains the cart snapshot, provisional order, checkout session
//! and payload models. Nothing here depends on HTTP, storage or crypto.

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payload;

pub use cart::{BillingPeriod, Cart, CartLine, Coupon, Product, SubscriptionTerms};
pub use checkout::{CheckoutForm, CheckoutSession, CreationDecision};
pub use orders::{Address, OrderId, OrderLineItem, OrderStatus, OrderTag, ProvisionalOrder, TempOrderState};
pub use payload::{
    CheckoutPayload, Contact, DiscountDetails, ItemDescription, ItemPricing, LocalizedPrice, LocalizedText,
    OrderTags, PayloadItem, QuantityBehavior, SealedSession, SessionPayload, SubscriptionPricing,
};
