//! Action-driven cart state transitions.
//!
//! [`reduce`] is the only way cart state changes in response to the shopper.
//! It is a plain function from `(state, action)` to the next state, so the
//! sync layer can apply it under a lock and publish the result.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::item::{CartItem, CartState, CouponCode};
use super::reference::ProductReference;

/// A cart mutation.
///
/// Serializes as `{"type": "ADD_ITEM", "payload": ...}`. Any `type` this
/// version does not know decodes to [`CartAction::Unknown`], whatever its
/// payload, and is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartAction {
    /// Replace the items wholesale. Used when adopting a loaded cart.
    SetItems(Vec<CartItem>),
    /// Add units of a product, merging into an existing line.
    AddItem(CartItem),
    /// Drop the line for a product.
    RemoveItem(ProductReference),
    /// Set a line's quantity exactly.
    UpdateQuantity {
        #[serde(rename = "productId")]
        product_ref: ProductReference,
        quantity: u32,
    },
    /// Remember a coupon code.
    ApplyCoupon(CouponCode),
    /// Empty the cart and forget the coupon.
    ClearCart,
    Unknown,
}

/// Wire shape shared by every action.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct QuantityPayload {
    #[serde(rename = "productId")]
    product_ref: ProductReference,
    #[serde(deserialize_with = "quantity_or_zero")]
    quantity: u32,
}

impl<'de> Deserialize<'de> for CartAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        fn payload<T: DeserializeOwned, E: serde::de::Error>(value: Value) -> Result<T, E> {
            serde_json::from_value(value).map_err(E::custom)
        }

        let Envelope { kind, payload: raw } = Envelope::deserialize(deserializer)?;
        let action = match kind.as_str() {
            "SET_ITEMS" => Self::SetItems(payload(raw)?),
            "ADD_ITEM" => Self::AddItem(payload(raw)?),
            "REMOVE_ITEM" => Self::RemoveItem(payload(raw)?),
            "UPDATE_QUANTITY" => {
                let QuantityPayload {
                    product_ref,
                    quantity,
                } = payload(raw)?;
                Self::UpdateQuantity {
                    product_ref,
                    quantity,
                }
            }
            "APPLY_COUPON" => Self::ApplyCoupon(payload(raw)?),
            "CLEAR_CART" => Self::ClearCart,
            _ => Self::Unknown,
        };
        Ok(action)
    }
}

/// Negative quantities cannot be represented and are read as 0.
fn quantity_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .map_or(0, |q| u32::try_from(q).unwrap_or(u32::MAX)))
}

/// Apply an action to a cart state.
///
/// | Action | Effect |
/// |---|---|
/// | `SetItems` | items replaced as given |
/// | `AddItem` | quantity (0 read as 1) added to the matching line, or appended |
/// | `RemoveItem` | matching line dropped; absent product is a no-op |
/// | `UpdateQuantity` | matching line set to exactly `quantity`, 0 included |
/// | `ApplyCoupon` | coupon set unconditionally |
/// | `ClearCart` | empty state |
/// | `Unknown` | no-op |
///
/// `UpdateQuantity` does not remove a line set to 0; callers that want the
/// line gone issue `RemoveItem`.
#[must_use]
pub fn reduce(state: CartState, action: CartAction) -> CartState {
    match action {
        CartAction::SetItems(items) => CartState { items, ..state },
        CartAction::AddItem(item) => add_item(state, item),
        CartAction::RemoveItem(product_ref) => {
            let id = product_ref.id();
            let mut state = state;
            state.items.retain(|item| !item.refers_to(&id));
            state
        }
        CartAction::UpdateQuantity {
            product_ref,
            quantity,
        } => {
            let id = product_ref.id();
            let mut state = state;
            for item in state.items.iter_mut().filter(|item| item.refers_to(&id)) {
                item.quantity = quantity;
            }
            state
        }
        CartAction::ApplyCoupon(code) => CartState {
            coupon: Some(code),
            ..state
        },
        CartAction::ClearCart => CartState::new(),
        CartAction::Unknown => state,
    }
}

fn add_item(mut state: CartState, mut item: CartItem) -> CartState {
    item.quantity = item.quantity.max(1);
    let id = item.id();
    match state.items.iter_mut().find(|existing| existing.refers_to(&id)) {
        Some(existing) => {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        }
        None => state.items.push(item),
    }
    state
}

impl CartAction {
    /// Short name used in logs and breadcrumbs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetItems(_) => "SET_ITEMS",
            Self::AddItem(_) => "ADD_ITEM",
            Self::RemoveItem(_) => "REMOVE_ITEM",
            Self::UpdateQuantity { .. } => "UPDATE_QUANTITY",
            Self::ApplyCoupon(_) => "APPLY_COUPON",
            Self::ClearCart => "CLEAR_CART",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    fn state_of(items: Vec<CartItem>) -> CartState {
        CartState {
            items,
            coupon: None,
        }
    }

    #[test]
    fn test_add_same_product_twice() {
        let action = CartAction::AddItem(CartItem::new("p9", 1));
        let state = reduce(reduce(CartState::new(), action.clone()), action);
        assert_eq!(state.items, vec![CartItem::new("p9", 2)]);
    }

    #[test]
    fn test_add_uses_incoming_quantity() {
        let state = reduce(
            state_of(vec![CartItem::new("p1", 1)]),
            CartAction::AddItem(CartItem::new("p1", 4)),
        );
        assert_eq!(state.items[0].quantity, 5);
    }

    #[test]
    fn test_add_zero_counts_as_one() {
        let state = reduce(CartState::new(), CartAction::AddItem(CartItem::new("p1", 0)));
        assert_eq!(state.items, vec![CartItem::new("p1", 1)]);

        let state = reduce(state, CartAction::AddItem(CartItem::new("p1", 0)));
        assert_eq!(state.items, vec![CartItem::new("p1", 2)]);
    }

    #[test]
    fn test_malformed_known_action_is_an_error() {
        let result: Result<CartAction, _> =
            serde_json::from_value(json!({ "type": "APPLY_COUPON", "payload": { "code": 5 } }));
        assert!(result.is_err());
    }

    #[test]
    fn test_add_keeps_lines_unique_across_shapes() {
        let payloads = [
            json!({ "type": "ADD_ITEM", "payload": { "productId": "p1" } }),
            json!({ "type": "ADD_ITEM", "payload": { "productId": { "_id": "p1" }, "quantity": 2 } }),
            json!({ "type": "ADD_ITEM", "payload": { "productId": "p2", "quantity": 1 } }),
            json!({ "type": "ADD_ITEM", "payload": { "productId": { "productId": "p2" } } }),
        ];

        let state = payloads.into_iter().fold(CartState::new(), |state, payload| {
            reduce(state, serde_json::from_value(payload).unwrap())
        });

        let ids: HashSet<_> = state.items.iter().map(CartItem::id).collect();
        assert_eq!(ids.len(), state.items.len());
        assert_eq!(state.total_quantity(), 5);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let state = state_of(vec![CartItem::new("p1", 1)]);
        let next = reduce(state.clone(), CartAction::RemoveItem("missing".into()));
        assert_eq!(next, state);
    }

    #[test]
    fn test_remove_by_populated_reference() {
        let reference: ProductReference =
            serde_json::from_value(json!({ "_id": "p1", "name": "Atta" })).unwrap();
        let state = state_of(vec![CartItem::new("p1", 1), CartItem::new("p2", 1)]);
        let next = reduce(state, CartAction::RemoveItem(reference));
        assert_eq!(next.items, vec![CartItem::new("p2", 1)]);
    }

    #[test]
    fn test_update_quantity_is_exact() {
        let state = state_of(vec![CartItem::new("p1", 3)]);
        let next = reduce(
            state,
            CartAction::UpdateQuantity {
                product_ref: "p1".into(),
                quantity: 1,
            },
        );
        assert_eq!(next.items[0].quantity, 1);
    }

    #[test]
    fn test_update_quantity_to_zero_keeps_line() {
        let action: CartAction = serde_json::from_value(json!({
            "type": "UPDATE_QUANTITY",
            "payload": { "productId": "p1", "quantity": 0 }
        }))
        .unwrap();

        let next = reduce(state_of(vec![CartItem::new("p1", 1)]), action);

        assert_eq!(next.items, vec![CartItem::new("p1", 0)]);
    }

    #[test]
    fn test_update_quantity_negative_reads_as_zero() {
        let action: CartAction = serde_json::from_value(json!({
            "type": "UPDATE_QUANTITY",
            "payload": { "productId": "p1", "quantity": -2 }
        }))
        .unwrap();
        assert_eq!(
            action,
            CartAction::UpdateQuantity {
                product_ref: "p1".into(),
                quantity: 0
            }
        );
    }

    #[test]
    fn test_apply_coupon_and_clear() {
        let state = reduce(
            state_of(vec![CartItem::new("p1", 1)]),
            CartAction::ApplyCoupon(CouponCode::new("SAVE100")),
        );
        assert_eq!(state.coupon, Some(CouponCode::new("SAVE100")));

        let cleared = reduce(state, CartAction::ClearCart);
        assert_eq!(cleared, CartState::new());
    }

    #[test]
    fn test_set_items_replaces_and_keeps_coupon() {
        let state = CartState {
            items: vec![CartItem::new("old", 1)],
            coupon: Some(CouponCode::new("AXISBANK")),
        };
        let next = reduce(state, CartAction::SetItems(vec![CartItem::new("new", 2)]));
        assert_eq!(next.items, vec![CartItem::new("new", 2)]);
        assert_eq!(next.coupon, Some(CouponCode::new("AXISBANK")));
    }

    #[test]
    fn test_unknown_action_is_noop() {
        let action: CartAction =
            serde_json::from_value(json!({ "type": "SHARE_CART" })).unwrap();
        assert_eq!(action, CartAction::Unknown);

        let with_payload: CartAction =
            serde_json::from_value(json!({ "type": "SHARE_CART", "payload": { "to": "x" } }))
                .unwrap();
        assert_eq!(with_payload, CartAction::Unknown);

        let state = state_of(vec![CartItem::new("p1", 2)]);
        assert_eq!(reduce(state.clone(), action), state);
    }
}
