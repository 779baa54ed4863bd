//! Checkout arithmetic and form validation.
//!
//! Payment itself is simulated by the storefront; this module only computes
//! what the shopper is shown and checks what they typed.

mod shipping;
mod summary;

pub use shipping::{CheckoutError, PaymentMethod, ShippingDetails};
pub use summary::{OrderSummary, SummaryRates};
