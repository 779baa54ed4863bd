//! Shopfront Core - Cart types and reconciliation logic.
//!
//! This crate provides the pure pieces of the cart subsystem used by the
//! other Shopfront components:
//! - `storefront` - Sync runtime (remote API client, fallback storage, coordinator)
//! - `cli` - Command-line cart tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no timers. Every operation here is deterministic, which is what
//! lets the sync coordinator replay them freely.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, and prices
//! - [`cart`] - Product references, the identifier normalizer, the merge engine, and the reducer
//! - [`checkout`] - Order summary arithmetic and shipping form validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod types;

pub use cart::{
    CartAction, CartItem, CartState, CouponCode, ProductReference, ProductSnapshot, merge,
    normalize, reduce,
};
pub use checkout::{CheckoutError, OrderSummary, PaymentMethod, ShippingDetails, SummaryRates};
pub use types::*;
