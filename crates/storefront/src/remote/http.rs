//! `reqwest` implementation of the backend collaborators.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shopfront_core::{CartItem, UserId};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::wire::{CartEnvelope, CartUpdate, LoginRequest, LoginResponse, SignUpRequest};
use super::{ApiError, AuthApi, AuthError, CartApi};
use crate::config::StorefrontConfig;
use crate::models::{Credentials, CurrentUser, Registration, Session};

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cookie the backend uses to hand out the session token.
const TOKEN_COOKIE: &str = "token";

/// Longest body excerpt kept in errors and logs.
const BODY_EXCERPT: usize = 200;

// =============================================================================
// HttpApi
// =============================================================================

/// Client for the JSON cart and auth backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        Self::with_base(config.api_url.clone(), config.http_timeout)
    }

    /// Create a client for an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying client cannot be built.
    pub fn with_base(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(HttpApiInner { client, base }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn cart_endpoint(&self, user_id: &UserId) -> Url {
        self.endpoint(&["api", "auth", "cart", user_id.as_str()])
    }

    /// Attach the correlation id every request carries.
    fn tag(request: RequestBuilder) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!(request_id = %request_id, "Sending backend request");
        request.header(REQUEST_ID_HEADER, request_id)
    }

    /// Token and user id of a session, or `SessionInvalid` when either is missing.
    fn credentials(session: &Session) -> Result<(&SecretString, &UserId), ApiError> {
        match (session.token(), session.user_id()) {
            (Some(token), Some(user_id)) => Ok((token, user_id)),
            _ => Err(ApiError::SessionInvalid),
        }
    }

    /// Map cart endpoint statuses onto `ApiError` and decode the body.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ApiError::SessionInvalid);
            }
            StatusCode::NOT_FOUND => return Err(ApiError::UserNotFound),
            _ => {}
        }

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %excerpt(&text),
                "Backend returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(
                error = %e,
                body = %excerpt(&text),
                "Failed to parse backend response"
            );
            ApiError::Decode(e)
        })
    }
}

impl CartApi for HttpApi {
    #[instrument(skip(self, session), fields(user_id))]
    async fn fetch_cart(&self, session: &Session) -> Result<Vec<CartItem>, ApiError> {
        let (token, user_id) = Self::credentials(session)?;
        tracing::Span::current().record("user_id", user_id.as_str());

        let response = Self::tag(self.inner.client.get(self.cart_endpoint(user_id)))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let envelope: CartEnvelope = Self::read_json(response).await?;
        debug!(items = envelope.cart.len(), "Fetched remote cart");
        Ok(envelope.cart)
    }

    #[instrument(skip(self, session, items), fields(user_id, items = items.len()))]
    async fn push_cart(&self, session: &Session, items: &[CartItem]) -> Result<(), ApiError> {
        let (token, user_id) = Self::credentials(session)?;
        tracing::Span::current().record("user_id", user_id.as_str());

        let response = Self::tag(self.inner.client.post(self.cart_endpoint(user_id)))
            .bearer_auth(token.expose_secret())
            .json(&CartUpdate::from_items(items))
            .send()
            .await?;

        // The echoed cart is not needed; only the status matters.
        let _: serde_json::Value = Self::read_json(response).await?;
        Ok(())
    }
}

impl AuthApi for HttpApi {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let body = LoginRequest {
            email: credentials.email.as_str().to_string(),
            password: credentials.password.expose_secret().to_string(),
        };

        let response = Self::tag(self.inner.client.post(self.endpoint(&["api", "auth", "login"])))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST => return Err(AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED => return Err(AuthError::EmailNotVerified),
            _ => {}
        }

        let cookie_token = token_from_cookies(response.headers());
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            }
            .into());
        }

        let parsed: LoginResponse = serde_json::from_str(&text).map_err(ApiError::Decode)?;
        let token = parsed.token.or(cookie_token);

        match (parsed.success, token, parsed.user) {
            (true, Some(token), Some(user)) => {
                debug!(user_id = %user.id, "Login accepted");
                Ok(Session::authenticated(SecretString::from(token), user))
            }
            _ => Err(ApiError::Status {
                status: status.as_u16(),
                body: "login response missing token or user".to_string(),
            }
            .into()),
        }
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<CurrentUser, AuthError> {
        let body = SignUpRequest {
            name: registration.name.clone(),
            email: registration.email.as_str().to_string(),
            password: registration.password.expose_secret().to_string(),
        };

        let response = Self::tag(self.inner.client.post(self.endpoint(&["api", "auth", "signUp"])))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(AuthError::AccountExists);
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            }
            .into());
        }

        let parsed: LoginResponse = serde_json::from_str(&text).map_err(ApiError::Decode)?;
        match (parsed.success, parsed.user) {
            (true, Some(user)) => {
                debug!(user_id = %user.id, "Account created");
                Ok(user)
            }
            _ => Err(ApiError::Status {
                status: status.as_u16(),
                body: "sign-up response missing user".to_string(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Pull the session token out of `Set-Cookie` headers.
fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::with_base(Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoints_join_under_base_path() {
        let api = api("http://localhost:5000");
        assert_eq!(
            api.cart_endpoint(&UserId::new("u1")).as_str(),
            "http://localhost:5000/api/auth/cart/u1"
        );

        let api = self::api("https://shop.example.com/backend/");
        assert_eq!(
            api.endpoint(&["api", "auth", "login"]).as_str(),
            "https://shop.example.com/backend/api/auth/login"
        );
        assert_eq!(
            api.endpoint(&["api", "auth", "signUp"]).as_str(),
            "https://shop.example.com/backend/api/auth/signUp"
        );
    }

    #[test]
    fn test_user_id_is_escaped() {
        let api = api("http://localhost:5000");
        assert_eq!(
            api.cart_endpoint(&UserId::new("a/b")).as_str(),
            "http://localhost:5000/api/auth/cart/a%2Fb"
        );
    }

    #[test]
    fn test_token_from_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("token=abc.def; HttpOnly; SameSite=Lax"),
        );
        assert_eq!(token_from_cookies(&headers), Some("abc.def".to_string()));

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("token=; Max-Age=0"));
        assert_eq!(token_from_cookies(&headers), None);
    }

    #[test]
    fn test_missing_credentials_is_session_invalid() {
        let err = HttpApi::credentials(&Session::guest()).unwrap_err();
        assert!(matches!(err, ApiError::SessionInvalid));
    }
}
