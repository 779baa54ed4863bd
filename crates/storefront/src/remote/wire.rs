//! JSON bodies exchanged with the backend.

use serde::{Deserialize, Serialize};
use shopfront_core::{CanonicalId, CartItem};

use crate::models::CurrentUser;

/// `POST /api/auth/login` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/signUp` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/login` and `POST /api/auth/signUp` response.
///
/// The token may be absent from the body when the backend only sets it as a
/// cookie.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CurrentUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `GET /api/auth/cart/{userId}`.
///
/// `productId` may be a bare id or a populated product document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartEnvelope {
    #[serde(default)]
    pub cart: Vec<CartItem>,
}

/// Body of `POST /api/auth/cart/{userId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartUpdate {
    pub cart: Vec<CartLine>,
}

/// A cart line as written back: product reduced to its canonical id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "productId")]
    pub product_id: CanonicalId,
    pub quantity: u32,
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.id(),
            quantity: item.quantity,
        }
    }
}

impl CartUpdate {
    #[must_use]
    pub fn from_items(items: &[CartItem]) -> Self {
        Self {
            cart: items.iter().map(CartLine::from).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use shopfront_core::ProductSnapshot;

    use super::*;

    #[test]
    fn test_populated_cart_decodes() {
        let envelope: CartEnvelope = serde_json::from_value(json!({
            "cart": [
                {"productId": {"_id": "p1", "name": "Chai", "offer_price": 250}, "quantity": 2},
                {"productId": "p2"}
            ]
        }))
        .unwrap();

        assert_eq!(envelope.cart.len(), 2);
        assert_eq!(envelope.cart[0].id(), CanonicalId::new("p1"));
        assert_eq!(envelope.cart[1].quantity, 1);
    }

    #[test]
    fn test_update_writes_canonical_ids() {
        let items = vec![
            CartItem::new(ProductSnapshot::new("p1").with_name("Chai"), 2),
            CartItem::new("p2", 1),
        ];
        let body = serde_json::to_value(CartUpdate::from_items(&items)).unwrap();

        assert_eq!(
            body,
            json!({"cart": [
                {"productId": "p1", "quantity": 2},
                {"productId": "p2", "quantity": 1}
            ]})
        );
    }
}
