//! Proportional allocation of a cart-level discount across line items

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places the item share is rounded to before multiplying
pub const PROPORTION_SCALE: u32 = 4;

/// Share of `discount_amount` attributable to an item costing `item_cost`
/// out of a discountable base of `total_cost`. Zero when the base is not positive.
pub fn allocate(discount_amount: Decimal, item_cost: Decimal, total_cost: Decimal) -> Decimal {
    if total_cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let proportion = (item_cost / total_cost)
        .round_dp_with_strategy(PROPORTION_SCALE, RoundingStrategy::MidpointAwayFromZero);
    discount_amount * proportion
}

/// Sum of the strictly positive unit prices; free items stay out of the base
pub fn discountable_total<I>(prices: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    prices.into_iter().filter(|p| *p > Decimal::ZERO).sum()
}
