//! Default checkout field validation

use validator::{Validate, ValidationErrors};

use crate::application::services::extensions::CheckoutValidator;
use crate::domain::cart::Cart;
use crate::domain::checkout::CheckoutForm;
use crate::shared::error::{AppError, AppResult};

pub const INVALID_PAYMENT_METHOD_MESSAGE: &str = "Invalid payment method";

/// Required billing fields, e-mail format, and the payment method id
pub struct FieldCheckoutValidator {
    gateway_id: String,
}

impl FieldCheckoutValidator {
    pub fn new(gateway_id: &str) -> Self {
        Self { gateway_id: gateway_id.to_string() }
    }

    /// Flatten field errors into user-facing messages, ordered by field name
    fn messages(errors: &ValidationErrors) -> Vec<String> {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut messages = Vec::new();
        for (field, errs) in fields {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid.", field.replace('_', " ")));
                if !messages.contains(&message) {
                    messages.push(message);
                }
            }
        }
        messages
    }
}

impl CheckoutValidator for FieldCheckoutValidator {
    fn validate(&self, form: &CheckoutForm, _cart: &Cart) -> AppResult<()> {
        if form.payment_method.as_deref() != Some(self.gateway_id.as_str()) {
            return Err(AppError::Validation(vec![INVALID_PAYMENT_METHOD_MESSAGE.to_string()]));
        }
        form.validate().map_err(|e| AppError::Validation(Self::messages(&e)))
    }
}
