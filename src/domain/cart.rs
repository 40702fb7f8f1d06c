//! Cart domain models read from the storefront cart collaborator

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billing interval unit for subscription products
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Adhoc,
    Day,
    Week,
    Month,
    Year,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Adhoc => "adhoc",
            BillingPeriod::Day => "day",
            BillingPeriod::Week => "week",
            BillingPeriod::Month => "month",
            BillingPeriod::Year => "year",
        }
    }
}

impl std::str::FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "adhoc" => Ok(BillingPeriod::Adhoc),
            "day" => Ok(BillingPeriod::Day),
            "week" => Ok(BillingPeriod::Week),
            "month" => Ok(BillingPeriod::Month),
            "year" => Ok(BillingPeriod::Year),
            _ => Err(format!("unsupported billing period: {}", s)),
        }
    }
}

/// Subscription terms attached to a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionTerms {
    /// Recurring price, excluding any signup fee
    pub price: Decimal,
    /// One-off fee charged on signup
    #[serde(default)]
    pub signup_fee: Decimal,
    /// Free trial length in days
    #[serde(default)]
    pub trial_days: u32,
    pub period: BillingPeriod,
    /// Number of periods per billing
    pub interval: u32,
    /// Total number of billings; zero or less means until cancelled
    #[serde(default)]
    pub length: i32,
}

/// Catalog product as seen by the checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub sku: String,
    pub image_url: Option<String>,
    pub subscription: Option<SubscriptionTerms>,
}

impl Product {
    pub fn is_subscription(&self) -> bool {
        self.subscription.is_some()
    }
}

/// A single cart line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub key: String,
    pub product: Product,
    pub variation_id: Option<u64>,
    pub quantity: u32,
    /// Line subtotal before cart-level discounts
    pub line_subtotal: Decimal,
    /// Line total after cart-level discounts
    pub line_total: Decimal,
    #[serde(default)]
    pub line_tax: Decimal,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl CartLine {
    /// Unit price derived from the line subtotal
    pub fn unit_price(&self) -> Decimal {
        if self.quantity == 0 {
            return Decimal::ZERO;
        }
        self.line_subtotal / Decimal::from(self.quantity)
    }
}

/// An applied coupon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub code: String,
    /// Discount type as configured on the coupon (e.g. "percent", "fixed_cart", "amount")
    pub discount_type: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

/// Snapshot of the shopper's cart
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub coupons: Vec<Coupon>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(|l| l.line_subtotal).sum()
    }
}
