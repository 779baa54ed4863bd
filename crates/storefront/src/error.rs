//! Unified error handling with Sentry integration.
//!
//! Provides the umbrella [`SyncError`] returned by the coordinator, plus the
//! helpers that attach user context and breadcrumbs to Sentry reports.

use shopfront_core::CheckoutError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::{ApiError, AuthError};
use crate::storage::StorageError;

/// Error type for storefront operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Backend operation failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Guest cart storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Checkout was rejected before payment.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

impl SyncError {
    /// Whether this failure is worth an error report rather than a message
    /// to the shopper.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Api(err) => !err.is_auth_failure(),
            Self::Auth(AuthError::Api(_)) | Self::Storage(_) => true,
            Self::Auth(_) | Self::Config(_) | Self::Checkout(_) => false,
        }
    }

    /// Capture internal failures to Sentry and log them.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.filter(|e| !e.is_empty()).map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a shopper action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "ADD_ITEM", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::from(ApiError::SessionInvalid);
        assert_eq!(err.to_string(), "Backend error: session invalid or expired");

        let err = SyncError::from(AuthError::EmailNotVerified);
        assert_eq!(err.to_string(), "Auth error: please verify your email first");

        let err = SyncError::from(CheckoutError::EmptyCart);
        assert_eq!(err.to_string(), "Checkout error: cart is empty");
    }

    #[test]
    fn test_internal_classification() {
        assert!(SyncError::from(ApiError::Status {
            status: 500,
            body: String::new()
        })
        .is_internal());
        assert!(!SyncError::from(ApiError::SessionInvalid).is_internal());
        assert!(!SyncError::from(AuthError::InvalidCredentials).is_internal());
        assert!(!SyncError::from(CheckoutError::MissingFields(vec!["name"])).is_internal());
    }
}
