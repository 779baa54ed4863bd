//! Order placement on top of the coordinator.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shopfront_core::{
    CartItem, CartState, CheckoutError, OrderSummary, PaymentMethod, ShippingDetails,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::CartSync;
use crate::error::{Result, add_breadcrumb};
use crate::remote::{AuthApi, CartApi};
use crate::storage::FallbackStore;

/// How long the simulated payment gateway takes to answer.
const PAYMENT_PROCESSING: Duration = Duration::from_secs(2);

/// Receipt for a placed order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub placed_at: DateTime<Utc>,
    pub payment: PaymentMethod,
    pub shipping: ShippingDetails,
    pub items: Vec<CartItem>,
    pub summary: OrderSummary,
}

impl<A, S> CartSync<A, S>
where
    A: CartApi + AuthApi,
    S: FallbackStore,
{
    /// Price the current cart with the configured rates.
    #[must_use]
    pub fn order_summary(&self) -> OrderSummary {
        OrderSummary::compute(&self.state(), &self.inner.config.rates)
    }

    /// Place an order for everything in the cart.
    ///
    /// Payment is simulated. On success the ordered lines are taken out of
    /// the cart as a shopper change, so the result is synced like any other
    /// edit. Lines added while the payment was running stay in the cart.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Checkout` when the cart is empty or a shipping
    /// field is blank. The cart is left untouched in that case.
    #[instrument(skip(self, shipping), fields(payment = ?payment))]
    pub async fn complete_checkout(
        &self,
        shipping: &ShippingDetails,
        payment: PaymentMethod,
    ) -> Result<OrderConfirmation> {
        let state = self.state();
        if state.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }
        shipping.validate()?;

        let summary = OrderSummary::compute(&state, &self.inner.config.rates);

        tokio::time::sleep(PAYMENT_PROCESSING).await;

        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4(),
            placed_at: Utc::now(),
            payment,
            shipping: shipping.clone(),
            items: state.items,
            summary,
        };

        let order_id = confirmation.order_id.to_string();
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
        info!(
            order_id = %order_id,
            total = %confirmation.summary.total,
            "Order placed"
        );

        self.apply("CHECKOUT", |state| remove_ordered(state, &confirmation.items));
        Ok(confirmation)
    }
}

/// Take ordered units out of the cart and drop the coupon.
///
/// A line whose quantity grew during payment keeps the difference.
fn remove_ordered(state: CartState, ordered: &[CartItem]) -> CartState {
    let items = state
        .items
        .into_iter()
        .filter_map(|mut item| {
            let id = item.id();
            let Some(bought) = ordered.iter().find(|line| line.refers_to(&id)) else {
                return Some(item);
            };
            item.quantity = item
                .quantity
                .checked_sub(bought.quantity)
                .filter(|left| *left > 0)?;
            Some(item)
        })
        .collect();

    CartState {
        items,
        coupon: None,
    }
}
