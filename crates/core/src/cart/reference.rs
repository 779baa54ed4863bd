//! Product references and the identifier normalizer.
//!
//! A cart line can point at its product in several shapes depending on where
//! the line came from:
//!
//! - a bare id (`"p1"`) from the local guest cart or an add-to-cart button,
//! - a populated product document (`{"_id": "p1", "name": ..., "offer_price": ...}`)
//!   from the account cart endpoint,
//! - a wrapper one level deep (`{"productId": {"_id": "p1"}}`) from older
//!   guest carts.
//!
//! [`normalize`] collapses every shape into one [`CanonicalId`], which is the
//! only thing cart equality looks at.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::types::CanonicalId;

/// Keys that carry the product id on a populated document, in priority order.
const ID_KEYS: [&str; 2] = ["_id", "id"];

/// Keys that wrap another reference one level deep.
const WRAPPER_KEYS: [&str; 2] = ["productId", "productRef"];

/// A reference to a product, in any of the shapes the storefront encounters.
///
/// Deserialization is total: any JSON value becomes some variant, with
/// [`ProductReference::Other`] catching shapes that carry no recognizable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ProductReference {
    /// A plain identifier.
    Id(CanonicalId),
    /// A populated product document.
    Product(ProductSnapshot),
    /// A structure wrapping another reference.
    Wrapped(Box<Self>),
    /// Anything else; normalized by stringification.
    Other(Value),
}

/// Denormalized product data carried by a populated reference.
///
/// Only `id` takes part in equality between cart lines; the remaining fields
/// are display data and are preserved verbatim through merges and round trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: CanonicalId,
    pub name: Option<String>,
    pub offer_price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub image_url: Option<String>,
    /// Fields this crate does not interpret.
    pub extra: Map<String, Value>,
}

/// Canonicalize a product reference into its [`CanonicalId`].
///
/// - plain ids are returned unchanged;
/// - populated documents yield their `_id` (or `id`);
/// - wrappers are unwrapped exactly one level, and the inner id is returned
///   when the inner value is an id or a populated document;
/// - anything else is coerced to its JSON text.
///
/// Never fails.
///
/// ```
/// use shopfront_core::{ProductReference, normalize};
///
/// let nested: ProductReference = serde_json::from_str(r#"{"productId": {"_id": "p1"}}"#).unwrap();
/// assert_eq!(normalize(&nested).as_str(), "p1");
/// assert_eq!(normalize(&ProductReference::from("p1")).as_str(), "p1");
/// ```
#[must_use]
pub fn normalize(reference: &ProductReference) -> CanonicalId {
    match reference {
        ProductReference::Wrapped(inner) => {
            direct_id(inner).unwrap_or_else(|| stringify(inner.as_ref().clone()))
        }
        other => direct_id(other).unwrap_or_else(|| stringify(other.clone())),
    }
}

fn direct_id(reference: &ProductReference) -> Option<CanonicalId> {
    match reference {
        ProductReference::Id(id) => Some(id.clone()),
        ProductReference::Product(product) => Some(product.id.clone()),
        ProductReference::Wrapped(_) | ProductReference::Other(_) => None,
    }
}

fn stringify(reference: ProductReference) -> CanonicalId {
    match Value::from(reference) {
        Value::String(s) => CanonicalId::new(s),
        value => CanonicalId::new(value.to_string()),
    }
}

impl ProductReference {
    /// The canonical id of this reference. Shorthand for [`normalize`].
    #[must_use]
    pub fn id(&self) -> CanonicalId {
        normalize(self)
    }

    /// Populated product data, if this reference (or the one it wraps) has any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&ProductSnapshot> {
        match self {
            Self::Product(product) => Some(product),
            Self::Wrapped(inner) => match inner.as_ref() {
                Self::Product(product) => Some(product),
                _ => None,
            },
            Self::Id(_) | Self::Other(_) => None,
        }
    }

    /// The display shape of this reference.
    ///
    /// Wrappers are replaced by the id or document they wrap, and shapes with
    /// no recognizable id become plain ids, so that downstream code only ever
    /// sees [`ProductReference::Id`] or [`ProductReference::Product`].
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Id(_) | Self::Product(_) => self,
            Self::Wrapped(inner) => match *inner {
                inner @ (Self::Id(_) | Self::Product(_)) => inner,
                nested => Self::Id(normalize(&Self::Wrapped(Box::new(nested)))),
            },
            Self::Other(_) => Self::Id(normalize(&self)),
        }
    }
}

impl From<&str> for ProductReference {
    fn from(id: &str) -> Self {
        Self::Id(CanonicalId::new(id))
    }
}

impl From<String> for ProductReference {
    fn from(id: String) -> Self {
        Self::Id(CanonicalId::new(id))
    }
}

impl From<CanonicalId> for ProductReference {
    fn from(id: CanonicalId) -> Self {
        Self::Id(id)
    }
}

impl From<ProductSnapshot> for ProductReference {
    fn from(product: ProductSnapshot) -> Self {
        Self::Product(product)
    }
}

impl From<Value> for ProductReference {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Id(CanonicalId::new(s)),
            Value::Object(map) => match ProductSnapshot::from_map(map) {
                Ok(product) => Self::Product(product),
                Err(map) => wrapped_from_map(map),
            },
            other => Self::Other(other),
        }
    }
}

/// Objects that carry no id of their own but wrap another reference. Keys
/// other than the wrapper key are not product data and are dropped.
fn wrapped_from_map(mut map: Map<String, Value>) -> ProductReference {
    let key = WRAPPER_KEYS
        .into_iter()
        .find(|key| map.get(*key).is_some_and(|v| !v.is_null()));

    match key.and_then(|key| map.remove(key)) {
        Some(inner) => ProductReference::Wrapped(Box::new(inner.into())),
        None => ProductReference::Other(Value::Object(map)),
    }
}

impl From<ProductReference> for Value {
    fn from(reference: ProductReference) -> Self {
        match reference {
            ProductReference::Id(id) => Self::String(id.into_inner()),
            ProductReference::Product(product) => Self::Object(product.into_map()),
            ProductReference::Wrapped(inner) => {
                let mut map = Map::new();
                map.insert(WRAPPER_KEYS[0].to_owned(), Self::from(*inner));
                Self::Object(map)
            }
            ProductReference::Other(value) => value,
        }
    }
}

impl ProductSnapshot {
    /// A snapshot carrying only an id.
    #[must_use]
    pub fn new(id: impl Into<CanonicalId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            offer_price: None,
            original_price: None,
            image_url: None,
            extra: Map::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the selling price.
    #[must_use]
    pub const fn with_offer_price(mut self, price: Decimal) -> Self {
        self.offer_price = Some(price);
        self
    }

    /// Build a snapshot from a JSON object, handing the object back untouched
    /// when it has no usable id.
    fn from_map(mut map: Map<String, Value>) -> Result<Self, Map<String, Value>> {
        let Some(key) = ID_KEYS
            .into_iter()
            .find(|key| map.get(*key).and_then(scalar_id).is_some())
        else {
            return Err(map);
        };
        let Some(id) = map.remove(key).as_ref().and_then(scalar_id) else {
            return Err(map);
        };

        Ok(Self {
            id,
            name: take_string(&mut map, "name"),
            offer_price: take_decimal(&mut map, "offer_price"),
            original_price: take_decimal(&mut map, "original_price"),
            image_url: take_string(&mut map, "image_url"),
            extra: map,
        })
    }

    fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(ID_KEYS[0].to_owned(), Value::String(self.id.into_inner()));
        if let Some(name) = self.name {
            map.insert("name".to_owned(), Value::String(name));
        }
        if let Some(price) = self.offer_price {
            map.insert("offer_price".to_owned(), decimal_value(price));
        }
        if let Some(price) = self.original_price {
            map.insert("original_price".to_owned(), decimal_value(price));
        }
        if let Some(url) = self.image_url {
            map.insert("image_url".to_owned(), Value::String(url));
        }
        for (key, value) in self.extra {
            map.entry(key).or_insert(value);
        }
        map
    }
}

fn scalar_id(value: &Value) -> Option<CanonicalId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(CanonicalId::new(s.as_str())),
        Value::Number(n) => Some(CanonicalId::new(n.to_string())),
        _ => None,
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !map.get(key).is_some_and(Value::is_string) {
        return None;
    }
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Remove a price field if it parses as a decimal; unparseable values stay in
/// the extra map so nothing is lost.
fn take_decimal(map: &mut Map<String, Value>, key: &str) -> Option<Decimal> {
    let parsed = match map.get(key)? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }?;
    map.remove(key);
    Some(parsed)
}

fn decimal_value(amount: Decimal) -> Value {
    if amount.fract().is_zero()
        && let Some(whole) = amount.to_i64()
    {
        return Value::Number(whole.into());
    }
    amount
        .to_f64()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(amount.to_string()), Value::Number)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> ProductReference {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_id() {
        let reference = parse(json!("p1"));
        assert_eq!(reference, ProductReference::from("p1"));
        assert_eq!(normalize(&reference).as_str(), "p1");
    }

    #[test]
    fn test_populated_document() {
        let reference = parse(json!({
            "_id": "p1",
            "name": "Masala Chai",
            "offer_price": 249.5,
            "original_price": "299",
            "image_url": "uploads/chai.png",
            "category": "tea"
        }));

        let snapshot = reference.snapshot().unwrap();
        assert_eq!(snapshot.id.as_str(), "p1");
        assert_eq!(snapshot.name.as_deref(), Some("Masala Chai"));
        assert_eq!(snapshot.offer_price, Some(Decimal::new(2495, 1)));
        assert_eq!(snapshot.original_price, Some(Decimal::new(299, 0)));
        assert_eq!(snapshot.extra.get("category"), Some(&json!("tea")));
        assert_eq!(normalize(&reference).as_str(), "p1");
    }

    #[test]
    fn test_id_alias() {
        let reference = parse(json!({ "id": "p2", "name": "Ghee" }));
        assert_eq!(normalize(&reference).as_str(), "p2");
    }

    #[test]
    fn test_numeric_id() {
        let reference = parse(json!({ "_id": 42 }));
        assert_eq!(normalize(&reference).as_str(), "42");
    }

    #[test]
    fn test_wrapped_one_level() {
        let by_doc = parse(json!({ "productId": { "_id": "p3" } }));
        let by_id = parse(json!({ "productRef": "p3" }));
        assert!(matches!(by_doc, ProductReference::Wrapped(_)));
        assert_eq!(normalize(&by_doc).as_str(), "p3");
        assert_eq!(normalize(&by_id).as_str(), "p3");
    }

    #[test]
    fn test_wrapped_two_levels_is_stringified() {
        let reference = parse(json!({ "productId": { "productId": "p4" } }));
        assert_eq!(normalize(&reference).as_str(), r#"{"productId":"p4"}"#);
    }

    #[test]
    fn test_unrecognized_shape_is_stringified() {
        assert_eq!(normalize(&parse(json!(17))).as_str(), "17");
        assert_eq!(normalize(&parse(json!(null))).as_str(), "null");
        assert_eq!(
            normalize(&parse(json!({ "sku": "x" }))).as_str(),
            r#"{"sku":"x"}"#
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let shapes = [
            json!("p1"),
            json!({ "_id": "p1", "name": "x" }),
            json!({ "productId": { "_id": "p1" } }),
            json!({ "productId": { "productId": "p1" } }),
            json!(12.5),
            json!([1, 2]),
        ];
        for shape in shapes {
            let once = normalize(&parse(shape));
            let twice = normalize(&ProductReference::from(once.clone()));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_canonical_shape() {
        let wrapped = parse(json!({ "productId": { "_id": "p5", "name": "Dal" } }));
        let canonical = wrapped.canonical();
        assert!(matches!(canonical, ProductReference::Product(_)));
        assert_eq!(canonical.id().as_str(), "p5");

        let other = parse(json!(99)).canonical();
        assert_eq!(other, ProductReference::from("99"));
    }

    #[test]
    fn test_populated_round_trip_preserves_fields() {
        let original = json!({
            "_id": "p1",
            "name": "Masala Chai",
            "offer_price": 249,
            "stock": 4
        });
        let reference = parse(original.clone());
        assert_eq!(serde_json::to_value(&reference).unwrap(), original);
    }
}
