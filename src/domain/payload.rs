//! Checkout payload sent to the hosted payment widget
//!
//! Field names follow the widget's session-builder wire format (camelCase);
//! amounts are kept as `Decimal` and emitted as JSON numbers.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::domain::cart::BillingPeriod;

/// Text keyed by language code
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    pub fn en(text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert("en".to_string(), text.into());
        Self(map)
    }

    pub fn with(mut self, lang: &str, text: impl Into<String>) -> Self {
        self.0.insert(lang.to_string(), text.into());
        self
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }
}

/// Amount in a single currency, serialized as `{ "<CUR>": <number> }`
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedPrice {
    pub currency: String,
    pub amount: Decimal,
}

impl LocalizedPrice {
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        Self { currency: currency.into(), amount }
    }
}

impl Serialize for LocalizedPrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.currency, &self.amount.to_f64().unwrap_or(0.0))?;
        map.end()
    }
}

/// Quantity handling requested from the widget
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuantityBehavior {
    /// Quantity is fixed and cannot be edited in the widget
    Lock,
}

/// Subscription terms on a payload item
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPricing {
    /// Free trial length in days
    pub trial: u32,
    pub interval: BillingPeriod,
    pub interval_length: u32,
    /// Total billings; `null` means unlimited
    pub interval_count: Option<u32>,
}

/// Discount block merged into an item's pricing
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscountDetails {
    pub discount_type: String,
    /// Per-unit discount keyed by minimum quantity
    pub quantity_discounts: BTreeMap<u32, LocalizedPrice>,
    pub discount_reason: LocalizedText,
}

impl DiscountDetails {
    /// Discount amount for the base quantity tier
    pub fn amount(&self) -> Option<Decimal> {
        self.quantity_discounts.get(&1).map(|p| p.amount)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemPricing {
    pub quantity_behavior: QuantityBehavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_default: Option<u32>,
    pub price: LocalizedPrice,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionPricing>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountDetails>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemDescription {
    pub summary: LocalizedText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<LocalizedText>,
}

/// One line of the checkout payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PayloadItem {
    pub product: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    pub pricing: ItemPricing,
    pub display: LocalizedText,
    pub description: ItemDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub removable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

impl PayloadItem {
    pub fn unit_price(&self) -> Decimal {
        self.pricing.price.amount
    }
}

/// Customer contact block
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_line1: String,
    pub address_line2: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct OrderTags {
    /// Store order id, zero when no order awaits payment
    pub store_order_id: u64,
}

/// Cart and customer snapshot handed to the payment widget
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutPayload {
    pub tags: OrderTags,
    /// Empty object when no order awaits payment
    #[serde(serialize_with = "serialize_contact")]
    pub contact: Option<Contact>,
    pub items: Vec<PayloadItem>,
}

fn serialize_contact<S: Serializer>(contact: &Option<Contact>, serializer: S) -> Result<S::Ok, S::Error> {
    match contact {
        Some(c) => c.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Body of a sealed session: ciphertext, or the raw payload in test mode
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SessionPayload {
    Encrypted(String),
    Plain(CheckoutPayload),
}

/// Envelope passed to the payment widget
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SealedSession {
    pub payload: SessionPayload,
    /// Wrapped symmetric key, empty in test mode
    pub key: String,
}
