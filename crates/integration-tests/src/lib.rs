//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! The tests drive the real `HttpApi` and `CartSync` against [`FakeBackend`],
//! an axum server on an ephemeral local port that speaks the backend's
//! auth and cart routes from memory.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shopfront_storefront::CurrentUser;
use shopfront_storefront::remote::wire::{LoginRequest, LoginResponse, SignUpRequest};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// FakeBackend
// =============================================================================

/// In-memory stand-in for the auth and cart backend.
pub struct FakeBackend {
    addr: SocketAddr,
    state: BackendState,
    server: JoinHandle<()>,
}

#[derive(Clone, Default)]
struct BackendState {
    inner: Arc<Mutex<BackendData>>,
}

#[derive(Default)]
struct BackendData {
    accounts: HashMap<String, Account>,
    carts: HashMap<String, Value>,
    pushes: Vec<Value>,
    request_ids: Vec<String>,
    cart_unavailable: bool,
}

struct Account {
    user: CurrentUser,
    password: String,
    verified: bool,
}

impl BackendState {
    fn lock(&self) -> MutexGuard<'_, BackendData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn spawn() -> Self {
        let state = BackendState::default();
        let app = Router::new()
            .route("/api/auth/signUp", post(sign_up))
            .route("/api/auth/login", post(login))
            .route("/api/auth/cart/{user_id}", get(get_cart).post(update_cart))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL to point `HttpApi` at.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    /// Register an account. Returns its user id.
    pub fn add_account(&self, email: &str, password: &str, verified: bool) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let account = Account {
            user: CurrentUser {
                id: id.clone().into(),
                name: "Test Shopper".to_string(),
                email: email.to_string(),
            },
            password: password.to_string(),
            verified,
        };
        let mut data = self.state.lock();
        data.accounts.insert(email.to_string(), account);
        data.carts.insert(id.clone(), json!([]));
        id
    }

    /// Mark an account's email as confirmed. Returns false for an unknown email.
    pub fn verify_account(&self, email: &str) -> bool {
        match self.state.lock().accounts.get_mut(email) {
            Some(account) => {
                account.verified = true;
                true
            }
            None => false,
        }
    }

    /// Make cart reads fail with 503 until switched back.
    pub fn set_cart_unavailable(&self, unavailable: bool) {
        self.state.lock().cart_unavailable = unavailable;
    }

    /// The token the backend issues for a user.
    #[must_use]
    pub fn token_for(user_id: &str) -> String {
        format!("tok-{user_id}")
    }

    /// Replace a user's stored cart with raw JSON lines.
    pub fn set_cart(&self, user_id: &str, cart: Value) {
        self.state.lock().carts.insert(user_id.to_string(), cart);
    }

    /// A user's stored cart as raw JSON.
    #[must_use]
    pub fn cart(&self, user_id: &str) -> Value {
        self.state
            .lock()
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Bodies of every cart update received, in order.
    #[must_use]
    pub fn pushes(&self) -> Vec<Value> {
        self.state.lock().pushes.clone()
    }

    /// `X-Request-Id` values seen, in order.
    #[must_use]
    pub fn request_ids(&self) -> Vec<String> {
        self.state.lock().request_ids.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A fresh directory under the system temp dir for guest cart files.
#[must_use]
pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("shopfront-it-{}", Uuid::new_v4()))
}

// =============================================================================
// Handlers
// =============================================================================

fn record_request(state: &BackendState, headers: &HeaderMap) {
    if let Some(id) = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        state.lock().request_ids.push(id.to_string());
    }
}

fn authorized(headers: &HeaderMap, user_id: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == FakeBackend::token_for(user_id))
}

async fn sign_up(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<SignUpRequest>,
) -> Response {
    record_request(&state, &headers);
    let mut data = state.lock();

    if data.accounts.contains_key(&body.email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "User already Exists"})),
        )
            .into_response();
    }

    let id = Uuid::new_v4().simple().to_string();
    let user = CurrentUser {
        id: id.clone().into(),
        name: body.name,
        email: body.email.clone(),
    };
    data.accounts.insert(
        body.email,
        Account {
            user: user.clone(),
            password: body.password,
            verified: false,
        },
    );
    data.carts.insert(id.clone(), json!([]));

    let response = LoginResponse {
        success: true,
        token: Some(FakeBackend::token_for(&id)),
        user: Some(user),
        message: Some("Signup successful. Please verify your email.".to_string()),
    };
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn login(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Response {
    record_request(&state, &headers);
    let data = state.lock();

    let Some(account) = data
        .accounts
        .get(&body.email)
        .filter(|account| account.password == body.password)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Invalid email or password"})),
        )
            .into_response();
    };

    if !account.verified {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Please verify your email first"})),
        )
            .into_response();
    }

    let token = FakeBackend::token_for(account.user.id.as_str());
    let response = LoginResponse {
        success: true,
        token: None,
        user: Some(account.user.clone()),
        message: None,
    };
    (
        [(header::SET_COOKIE, format!("token={token}; HttpOnly; Path=/"))],
        Json(response),
    )
        .into_response()
}

async fn get_cart(
    State(state): State<BackendState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_request(&state, &headers);
    if !authorized(&headers, &user_id) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let data = state.lock();
    if data.cart_unavailable {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    match data.carts.get(&user_id) {
        Some(cart) => Json(json!({"cart": cart})).into_response(),
        None => (StatusCode::NOT_FOUND, "User not found").into_response(),
    }
}

async fn update_cart(
    State(state): State<BackendState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_request(&state, &headers);
    if !authorized(&headers, &user_id) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let cart = body.get("cart").cloned().unwrap_or_else(|| json!([]));
    let mut data = state.lock();
    data.pushes.push(body);
    data.carts.insert(user_id, cart.clone());
    Json(json!({"message": "Cart updated", "cart": cart})).into_response()
}
