//! Order summary computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartState, CouponCode};
use crate::types::{CurrencyCode, Price};

/// Tax rate and fees applied on top of the item subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryRates {
    /// Fraction of the subtotal charged as tax (0.18 for 18% GST).
    pub tax_rate: Decimal,
    /// Flat fee added to every non-empty order.
    pub platform_fee: Decimal,
    pub currency: CurrencyCode,
}

impl Default for SummaryRates {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(18, 2),
            platform_fee: Decimal::new(20, 0),
            currency: CurrencyCode::INR,
        }
    }
}

/// What the shopper pays, line by line.
///
/// Coupon discounts are priced by the backend and are not part of this
/// total; the applied code is carried along for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub item_count: u32,
    pub subtotal: Price,
    pub tax: Price,
    pub platform_fee: Price,
    pub total: Price,
    pub coupon: Option<CouponCode>,
}

impl OrderSummary {
    /// Compute the summary for a cart.
    ///
    /// Lines whose reference carries no `offer_price` contribute nothing to
    /// the subtotal. The platform fee only applies when the cart has items.
    ///
    /// Prices come from backend data, so arithmetic saturates at the
    /// largest representable amount instead of overflowing.
    #[must_use]
    pub fn compute(state: &CartState, rates: &SummaryRates) -> Self {
        let subtotal = state
            .items
            .iter()
            .filter_map(|item| {
                let price = item.product_ref.snapshot()?.offer_price?;
                Some(price.saturating_mul(Decimal::from(item.quantity)))
            })
            .fold(Decimal::ZERO, Decimal::saturating_add);

        let tax = subtotal.saturating_mul(rates.tax_rate);
        let fee = if state.is_empty() {
            Decimal::ZERO
        } else {
            rates.platform_fee
        };
        let currency = rates.currency;

        Self {
            item_count: state.total_quantity(),
            subtotal: Price::new(subtotal, currency),
            tax: Price::new(tax, currency),
            platform_fee: Price::new(fee, currency),
            total: Price::new(subtotal.saturating_add(tax).saturating_add(fee), currency),
            coupon: state.coupon.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{CartItem, ProductSnapshot};

    #[test]
    fn test_summary_totals() {
        let chai = ProductSnapshot::new("p1").with_offer_price(Decimal::new(250, 0));
        let dal = ProductSnapshot::new("p2").with_offer_price(Decimal::new(1005, 1));
        let state = CartState {
            items: vec![
                CartItem::new(chai, 2),
                CartItem::new(dal, 1),
                CartItem::new("unpriced", 3),
            ],
            coupon: Some(CouponCode::new("SAVE100")),
        };

        let summary = OrderSummary::compute(&state, &SummaryRates::default());

        assert_eq!(summary.item_count, 6);
        assert_eq!(summary.subtotal.amount, Decimal::new(6005, 1));
        assert_eq!(summary.tax.amount, Decimal::new(10809, 2));
        assert_eq!(summary.platform_fee.amount, Decimal::new(20, 0));
        assert_eq!(summary.total.amount, Decimal::new(72859, 2));
        assert_eq!(summary.total.to_string(), "₹728.59");
        assert_eq!(summary.coupon, Some(CouponCode::new("SAVE100")));
    }

    #[test]
    fn test_huge_prices_saturate() {
        let gold = ProductSnapshot::new("p1").with_offer_price(Decimal::MAX);
        let state = CartState {
            items: vec![CartItem::new(gold, 2), CartItem::new("p2", 1)],
            coupon: None,
        };

        let summary = OrderSummary::compute(&state, &SummaryRates::default());

        assert_eq!(summary.subtotal.amount, Decimal::MAX);
        assert_eq!(summary.total.amount, Decimal::MAX);
        assert_eq!(summary.item_count, 3);
    }

    #[test]
    fn test_empty_cart_has_no_fee() {
        let summary = OrderSummary::compute(&CartState::new(), &SummaryRates::default());
        assert_eq!(summary.total.amount, Decimal::ZERO);
        assert_eq!(summary.item_count, 0);
    }
}
