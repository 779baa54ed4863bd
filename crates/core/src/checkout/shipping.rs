//! Shipping form and payment method.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised before an order can be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,
    /// Required shipping fields were left blank.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Shipping details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl ShippingDetails {
    /// Check that every required field has non-blank content.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingFields`] listing each blank field in
    /// form order.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let missing: Vec<&'static str> = [
            ("name", &self.name),
            ("email", &self.email),
            ("address", &self.address),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::MissingFields(missing))
        }
    }
}

/// How the shopper pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    /// Cash on delivery.
    Cod,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "cod" => Ok(Self::Cod),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_details() {
        let details = ShippingDetails {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            address: "12 MG Road, Pune".to_string(),
        };
        assert_eq!(details.validate(), Ok(()));
    }

    #[test]
    fn test_blank_fields_reported_in_order() {
        let details = ShippingDetails {
            name: "  ".to_string(),
            email: "asha@example.com".to_string(),
            address: String::new(),
        };
        let err = details.validate().unwrap_err();
        assert_eq!(err, CheckoutError::MissingFields(vec!["name", "address"]));
        assert_eq!(err.to_string(), "missing required fields: name, address");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("COD".parse::<PaymentMethod>(), Ok(PaymentMethod::Cod));
        assert!("upi".parse::<PaymentMethod>().is_err());
    }
}
