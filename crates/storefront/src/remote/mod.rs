//! Backend collaborators for cart persistence and login.
//!
//! # Architecture
//!
//! - [`CartApi`] and [`AuthApi`] are the seams the sync coordinator talks to
//! - [`HttpApi`] implements both against the JSON backend over `reqwest`
//! - The backend is the source of truth for a logged-in shopper's cart; the
//!   guest cart lives in [`crate::storage`]
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::remote::{CartApi, HttpApi};
//!
//! let api = HttpApi::new(&config)?;
//! let items = api.fetch_cart(&session).await?;
//! ```

mod http;
pub mod wire;

pub use http::HttpApi;

use std::future::Future;

use shopfront_core::{CartItem, EmailError};
use thiserror::Error;

use crate::models::{Credentials, CurrentUser, Registration, Session};

/// Errors that can occur when talking to the cart backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable session, or the backend rejected the token.
    #[error("session invalid or expired")]
    SessionInvalid,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an unexpected status.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The user id in the session is unknown to the backend.
    #[error("user not found")]
    UserNotFound,
}

impl ApiError {
    /// Whether the failure means the stored session is no longer usable.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::SessionInvalid | Self::UserNotFound)
    }
}

/// Errors that can occur during login or sign-up.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Account exists but the email address was never confirmed.
    #[error("please verify your email first")]
    EmailNotVerified,

    /// Sign-up for an email that already has an account.
    #[error("an account with this email already exists")]
    AccountExists,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Transport or protocol failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api(ApiError::Http(err))
    }
}

/// Remote persistence of a logged-in shopper's cart.
pub trait CartApi: Send + Sync + 'static {
    /// Read the stored cart. Items may carry populated product references.
    fn fetch_cart(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<CartItem>, ApiError>> + Send;

    /// Replace the stored cart with `items`.
    fn push_cart(
        &self,
        session: &Session,
        items: &[CartItem],
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Account creation and login.
pub trait AuthApi: Send + Sync + 'static {
    /// Exchange credentials for a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    /// Create an account. It cannot log in until its email is verified.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<CurrentUser, AuthError>> + Send;
}
