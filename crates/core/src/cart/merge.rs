//! Guest/account cart reconciliation.

use super::item::CartItem;

/// Merge a local (guest) cart into a remote (account) cart.
///
/// The remote list is the base: its lines keep their order, quantities, and
/// product data. Each local line is matched by canonical id against the
/// working list; a match has the local quantity added to it, anything else
/// is appended in local order. Because appended lines join the working list,
/// repeated ids within `local` collapse into their first occurrence.
///
/// Quantities are summed, so merging the same local cart twice counts it
/// twice. Callers must merge at most once per login.
///
/// ```
/// use shopfront_core::{CartItem, merge};
///
/// let remote = vec![CartItem::new("p1", 1), CartItem::new("p2", 3)];
/// let local = vec![CartItem::new("p1", 2)];
/// let merged = merge(remote, local);
/// assert_eq!(merged, vec![CartItem::new("p1", 3), CartItem::new("p2", 3)]);
/// ```
#[must_use]
pub fn merge(remote: Vec<CartItem>, local: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged = remote;

    for item in local {
        let id = item.id();
        match merged.iter_mut().find(|existing| existing.refers_to(&id)) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => merged.push(item),
        }
    }

    merged
}
