//! Provisional order domain models and lifecycle states

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::{Cart, CartLine};

pub type OrderId = u64;

/// Order status as maintained by the order collaborator.
///
/// These statuses may change out-of-band (payment webhooks, admin actions)
/// and are consulted before any lifecycle transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }

    /// Statuses under which a provisional order must never be deleted
    pub fn blocks_deletion(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::OnHold | OrderStatus::Refunded)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches("wc-") {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "on-hold" => Ok(OrderStatus::OnHold),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// Checkout tag carried by an order record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderTag {
    Temporary,
    Finalized,
}

/// Lifecycle state of a provisional order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TempOrderState {
    None,
    Pending,
    Updated,
    Finalized,
    Deleted,
}

impl TempOrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TempOrderState::Finalized | TempOrderState::Deleted)
    }

    pub fn can_transition_to(&self, next: TempOrderState) -> bool {
        use TempOrderState::*;
        matches!(
            (self, next),
            (None, Pending)
                | (Pending, Updated)
                | (Updated, Updated)
                | (Pending, Finalized)
                | (Updated, Finalized)
                | (Pending, Deleted)
                | (Updated, Deleted)
        )
    }
}

/// Contact and address block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub address_1: String,
    #[serde(default)]
    pub address_2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// Order line item copied from a cart line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    pub product_id: u64,
    pub variation_id: Option<u64>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub tax: Decimal,
    /// Discount apportioned to this line at finalize time
    pub discount: Decimal,
    pub meta: BTreeMap<String, String>,
}

impl From<&CartLine> for OrderLineItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            variation_id: line.variation_id,
            name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price(),
            subtotal: line.line_subtotal,
            total: line.line_total,
            tax: line.line_tax,
            discount: Decimal::ZERO,
            meta: line.meta.clone(),
        }
    }
}

/// Provisional ("temporary") order record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionalOrder {
    pub id: OrderId,
    pub session_id: String,
    pub status: OrderStatus,
    pub tag: Option<OrderTag>,
    /// Number of updates applied since creation
    pub revision: u32,
    pub line_items: Vec<OrderLineItem>,
    pub billing: Address,
    pub shipping: Address,
    pub customer_note: Option<String>,
    pub payment_method: Option<String>,
    pub payment_method_title: Option<String>,
    pub created_via: Option<String>,
    pub applied_coupons: Vec<String>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub external_reference: Option<String>,
    /// Identifier of the only finalize credential currently accepted for this order
    pub finalize_credential_id: Option<String>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProvisionalOrder {
    /// Draft a new temporary order from the current cart
    pub fn draft(session_id: &str, cart: &Cart, now: DateTime<Utc>) -> Self {
        let mut order = Self {
            id: 0,
            session_id: session_id.to_string(),
            status: OrderStatus::Pending,
            tag: Some(OrderTag::Temporary),
            revision: 0,
            line_items: Vec::new(),
            billing: Address::default(),
            shipping: Address::default(),
            customer_note: None,
            payment_method: None,
            payment_method_title: None,
            created_via: None,
            applied_coupons: Vec::new(),
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            total: Decimal::ZERO,
            external_reference: None,
            finalize_credential_id: None,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        order.replace_line_items(cart);
        order
    }

    pub fn is_temporary(&self) -> bool {
        self.tag == Some(OrderTag::Temporary)
    }

    pub fn lifecycle_state(&self) -> TempOrderState {
        match self.tag {
            Some(OrderTag::Finalized) => TempOrderState::Finalized,
            Some(OrderTag::Temporary) if self.revision == 0 => TempOrderState::Pending,
            Some(OrderTag::Temporary) => TempOrderState::Updated,
            None => TempOrderState::None,
        }
    }

    /// Remove every line item and re-add from the cart, then recalculate totals
    pub fn replace_line_items(&mut self, cart: &Cart) {
        self.line_items = cart
            .lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(OrderLineItem::from)
            .collect();
        self.calculate_totals();
    }

    pub fn calculate_totals(&mut self) {
        self.subtotal = self.line_items.iter().map(|i| i.subtotal).sum();
        let discount = self.discount_total.min(self.subtotal);
        self.total = (self.subtotal - discount).max(Decimal::ZERO);
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}
