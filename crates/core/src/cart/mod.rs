//! Cart model and the pure operations over it.
//!
//! - [`reference`] - Heterogeneous product references and the identifier normalizer
//! - [`item`] - Cart line items and cart state
//! - [`merge`](mod@merge) - Guest/account cart reconciliation
//! - [`reducer`] - Action-driven state transitions

pub mod item;
pub mod merge;
pub mod reducer;
pub mod reference;

pub use item::{CartItem, CartState, CouponCode};
pub use merge::merge;
pub use reducer::{CartAction, reduce};
pub use reference::{ProductReference, ProductSnapshot, normalize};
