//! Cart line items and cart state.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::reference::ProductReference;
use crate::types::CanonicalId;

/// A single cart line.
///
/// On the wire and in storage the product reference lives under `productId`.
/// When reading, a missing, zero, or non-numeric quantity is taken as 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "productId")]
    pub product_ref: ProductReference,
    #[serde(default = "default_quantity", deserialize_with = "quantity_or_one")]
    pub quantity: u32,
}

impl CartItem {
    /// Create a cart line.
    #[must_use]
    pub fn new(product_ref: impl Into<ProductReference>, quantity: u32) -> Self {
        Self {
            product_ref: product_ref.into(),
            quantity,
        }
    }

    /// Canonical id of the product this line refers to.
    #[must_use]
    pub fn id(&self) -> CanonicalId {
        self.product_ref.id()
    }

    /// Whether this line refers to the product with the given canonical id.
    #[must_use]
    pub fn refers_to(&self, id: &CanonicalId) -> bool {
        self.product_ref.id() == *id
    }

    /// The same line with its reference in display shape.
    #[must_use]
    pub fn canonical(self) -> Self {
        Self {
            product_ref: self.product_ref.canonical(),
            quantity: self.quantity,
        }
    }
}

const fn default_quantity() -> u32 {
    1
}

fn quantity_or_one<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let quantity = value
        .as_ref()
        .and_then(Value::as_u64)
        .filter(|q| *q > 0)
        .map_or(1, |q| u32::try_from(q).unwrap_or(u32::MAX));
    Ok(quantity)
}

/// A coupon code as entered by the shopper.
///
/// Validity is decided elsewhere; the cart only remembers what was applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CouponCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cart as the shopper sees it.
///
/// Items are unique by canonical product id. An item sits at quantity 0 only
/// if it was explicitly set there through `UPDATE_QUANTITY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub coupon: Option<CouponCode>,
}

impl CartState {
    /// An empty cart with no coupon.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            coupon: None,
        }
    }

    /// Find the line for a product.
    #[must_use]
    pub fn find(&self, id: &CanonicalId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.refers_to(id))
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
