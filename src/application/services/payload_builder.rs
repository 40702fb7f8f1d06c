//! Builds the typed checkout payload from cart and order state

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use crate::application::services::discount;
use crate::application::services::extensions::{CheckoutExtensions, CouponAmountTransform, ItemPriceTransform};
use crate::config::GatewayConfig;
use crate::domain::cart::{Cart, CartLine, Coupon};
use crate::domain::orders::ProvisionalOrder;
use crate::domain::payload::{
    CheckoutPayload, Contact, DiscountDetails, ItemDescription, ItemPricing, LocalizedPrice, LocalizedText,
    OrderTags, PayloadItem, QuantityBehavior, SubscriptionPricing,
};
use crate::shared::validation::ValidationUtils;

/// Summary used on generated signup fee items
pub const SIGNUP_FEE_SUMMARY: &str = "Subscription signup fee";

pub struct PayloadBuilder {
    currency: String,
    placeholder_image_url: String,
    item_price: Arc<dyn ItemPriceTransform>,
    coupon_amount: Arc<dyn CouponAmountTransform>,
}

impl PayloadBuilder {
    pub fn new(gateway: &GatewayConfig, extensions: &CheckoutExtensions) -> Self {
        Self {
            currency: gateway.currency.clone(),
            placeholder_image_url: gateway.placeholder_image_url.clone(),
            item_price: extensions.item_price.clone(),
            coupon_amount: extensions.coupon_amount.clone(),
        }
    }

    /// Snapshot `cart`; contact and tags come from the order awaiting payment, if any
    pub fn build(&self, cart: &Cart, awaiting_payment: Option<&ProvisionalOrder>) -> CheckoutPayload {
        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            self.push_line_items(line, &mut items);
        }
        self.apply_discounts(cart, &mut items);

        CheckoutPayload {
            tags: OrderTags { store_order_id: awaiting_payment.map(|o| o.id).unwrap_or(0) },
            contact: awaiting_payment.map(contact_from_order),
            items,
        }
    }

    fn price(&self, amount: Decimal) -> LocalizedPrice {
        LocalizedPrice::new(self.currency.clone(), amount)
    }

    fn image(&self, line: &CartLine) -> String {
        let url = line
            .product
            .image_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.placeholder_image_url);
        ValidationUtils::protocol_relative_url(url)
    }

    fn push_line_items(&self, line: &CartLine, items: &mut Vec<PayloadItem>) {
        let product = &line.product;
        let (base_price, fee, subscription) = match &product.subscription {
            Some(terms) => (
                terms.price,
                terms.signup_fee,
                Some(SubscriptionPricing {
                    trial: terms.trial_days,
                    interval: terms.period,
                    interval_length: terms.interval,
                    interval_count: u32::try_from(terms.length).ok().filter(|count| *count > 0),
                }),
            ),
            None => (line.unit_price(), Decimal::ZERO, None),
        };

        let summary = LocalizedText::en(product.short_description.clone());
        items.push(PayloadItem {
            product: product.slug.clone(),
            quantity: None,
            pricing: ItemPricing {
                quantity_behavior: QuantityBehavior::Lock,
                quantity_default: Some(line.quantity),
                price: self.price(self.item_price.transform(line, base_price)),
                subscription,
                discount: None,
            },
            display: LocalizedText::en(product.name.clone()),
            description: ItemDescription { summary: summary.clone(), full: Some(summary) },
            image: Some(self.image(line)),
            removable: false,
            sku: Some(product.sku.clone()),
        });

        // The widget cannot combine a trial with a signup fee on one item
        if fee > Decimal::ZERO {
            items.push(PayloadItem {
                product: format!("{}-signup-fee", product.slug),
                quantity: Some(line.quantity),
                pricing: ItemPricing {
                    quantity_behavior: QuantityBehavior::Lock,
                    quantity_default: None,
                    price: self.price(self.item_price.transform(line, fee)),
                    subscription: None,
                    discount: None,
                },
                display: LocalizedText::en(format!("{} signup fee", product.name)),
                description: ItemDescription { summary: LocalizedText::en(SIGNUP_FEE_SUMMARY), full: None },
                image: None,
                removable: false,
                sku: None,
            });
        }
    }

    fn active_coupon<'a>(&self, cart: &'a Cart) -> Option<&'a Coupon> {
        let (first, rest) = cart.coupons.split_first()?;
        if !rest.is_empty() {
            let ignored: Vec<&str> = rest.iter().map(|c| c.code.as_str()).collect();
            warn!(applied = %first.code, ignored = ?ignored, "Multiple coupons in cart; only the first is sent");
        }
        Some(first)
    }

    fn apply_discounts(&self, cart: &Cart, items: &mut [PayloadItem]) {
        let Some(coupon) = self.active_coupon(cart) else {
            return;
        };
        let amount = self.coupon_amount.transform(coupon, coupon.amount);
        if amount <= Decimal::ZERO {
            return;
        }

        let total = discount::discountable_total(items.iter().map(PayloadItem::unit_price));
        let reason = LocalizedText::en(coupon.description.clone()).with("de", coupon.description.clone());
        for item in items.iter_mut() {
            let allocated = discount::allocate(amount, item.unit_price(), total);
            let mut quantity_discounts = BTreeMap::new();
            quantity_discounts.insert(1, self.price(allocated));
            item.pricing.discount = Some(DiscountDetails {
                discount_type: coupon.discount_type.clone(),
                quantity_discounts,
                discount_reason: reason.clone(),
            });
        }
    }
}

fn contact_from_order(order: &ProvisionalOrder) -> Contact {
    let billing = &order.billing;
    Contact {
        email: billing.email.clone(),
        first_name: billing.first_name.clone(),
        last_name: billing.last_name.clone(),
        company: billing.company.clone(),
        address_line1: billing.address_1.clone(),
        address_line2: billing.address_2.clone(),
        region: billing.state.clone(),
        city: billing.city.clone(),
        postal_code: billing.postcode.clone(),
        country: billing.country.clone(),
        phone_number: billing.phone.clone(),
    }
}
