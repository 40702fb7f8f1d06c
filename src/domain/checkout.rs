//! Checkout session and submitted form models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::orders::{Address, OrderId};

/// One checkout attempt, scoped to a browser session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Provisional order currently awaiting payment, if any
    pub order_awaiting_payment: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            order_awaiting_payment: None,
            created_at: Utc::now(),
        }
    }
}

/// Checkout form as submitted by the storefront
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
pub struct CheckoutForm {
    #[validate(required(message = "Billing First name is a required field."), length(min = 1, message = "Billing First name is a required field."))]
    pub billing_first_name: Option<String>,
    #[validate(required(message = "Billing Last name is a required field."), length(min = 1, message = "Billing Last name is a required field."))]
    pub billing_last_name: Option<String>,
    pub billing_company: Option<String>,
    #[validate(required(message = "Billing Country / Region is a required field."), length(min = 2, message = "Billing Country / Region is a required field."))]
    pub billing_country: Option<String>,
    pub billing_state: Option<String>,
    pub billing_city: Option<String>,
    pub billing_postcode: Option<String>,
    pub billing_address_1: Option<String>,
    pub billing_address_2: Option<String>,
    #[validate(length(max = 32, message = "Billing Phone is not a valid phone number."))]
    pub billing_phone: Option<String>,
    #[validate(required(message = "Billing Email address is a required field."), email(message = "Invalid billing email address"))]
    pub billing_email: Option<String>,
    pub shipping_first_name: Option<String>,
    pub shipping_last_name: Option<String>,
    pub shipping_company: Option<String>,
    pub shipping_country: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_postcode: Option<String>,
    pub shipping_address_1: Option<String>,
    pub shipping_address_2: Option<String>,
    pub customer_note: Option<String>,
    pub payment_method: Option<String>,
    pub payment_method_title: Option<String>,
}

fn overlay(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

impl CheckoutForm {
    /// Apply submitted billing fields over an existing address
    pub fn apply_billing(&self, address: &mut Address) {
        overlay(&mut address.first_name, &self.billing_first_name);
        overlay(&mut address.last_name, &self.billing_last_name);
        overlay(&mut address.company, &self.billing_company);
        overlay(&mut address.country, &self.billing_country);
        overlay(&mut address.state, &self.billing_state);
        overlay(&mut address.city, &self.billing_city);
        overlay(&mut address.postcode, &self.billing_postcode);
        overlay(&mut address.address_1, &self.billing_address_1);
        overlay(&mut address.address_2, &self.billing_address_2);
        overlay(&mut address.phone, &self.billing_phone);
        overlay(&mut address.email, &self.billing_email);
    }

    /// Apply submitted shipping fields; the shipping phone mirrors the billing phone
    pub fn apply_shipping(&self, address: &mut Address) {
        overlay(&mut address.first_name, &self.shipping_first_name);
        overlay(&mut address.last_name, &self.shipping_last_name);
        overlay(&mut address.company, &self.shipping_company);
        overlay(&mut address.country, &self.shipping_country);
        overlay(&mut address.state, &self.shipping_state);
        overlay(&mut address.city, &self.shipping_city);
        overlay(&mut address.postcode, &self.shipping_postcode);
        overlay(&mut address.address_1, &self.shipping_address_1);
        overlay(&mut address.address_2, &self.shipping_address_2);
        overlay(&mut address.phone, &self.billing_phone);
    }
}

/// Outcome of the creation guard extension point
#[derive(Debug, Clone, PartialEq)]
pub enum CreationDecision {
    Allow,
    Deny {
        result: String,
        kind: String,
        message: String,
    },
}

impl CreationDecision {
    /// Denial using the stock login-required wording
    pub fn login_required() -> Self {
        CreationDecision::Deny {
            result: "error".to_string(),
            kind: "temp_order_blocked".to_string(),
            message: "You must be logged in to checkout with these products.".to_string(),
        }
    }
}
