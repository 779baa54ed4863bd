//! End-to-end cart sync against the fake backend over real HTTP.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use shopfront_core::{CartItem, Email, UserId};
use shopfront_integration_tests::{FakeBackend, scratch_dir};
use shopfront_storefront::{
    AuthError, CartSync, Credentials, CurrentUser, FallbackStore, FileStore, HttpApi,
    LoginOutcome, Registration, Session, SyncConfig, SyncError,
};

const EMAIL: &str = "asha@example.com";
const PASSWORD: &str = "correct horse";

fn config() -> SyncConfig {
    SyncConfig {
        debounce: Duration::from_millis(50),
        ..SyncConfig::default()
    }
}

fn api(backend: &FakeBackend) -> HttpApi {
    HttpApi::with_base(backend.url(), Duration::from_secs(5)).unwrap()
}

fn credentials(password: &str) -> Credentials {
    Credentials::new(Email::parse(EMAIL).unwrap(), password)
}

fn session_for(user_id: &str, token: &str) -> Session {
    Session::unverified(
        SecretString::from(token.to_string()),
        CurrentUser {
            id: UserId::new(user_id),
            name: "Test Shopper".to_string(),
            email: EMAIL.to_string(),
        },
    )
}

fn guest_store() -> FileStore {
    FileStore::new(scratch_dir().join("guest-cart.json"))
}

fn cleanup(store: &FileStore) {
    if let Some(dir) = store.path().parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn test_login_merges_guest_file_and_pushes_canonical_ids() {
    let backend = FakeBackend::spawn().await;
    let user_id = backend.add_account(EMAIL, PASSWORD, true);
    backend.set_cart(
        &user_id,
        json!([
            {"productId": {"_id": "p1", "name": "Masala Chai", "offer_price": 250}, "quantity": 1},
            {"productId": {"_id": "p2", "name": "Toor Dal"}, "quantity": 3}
        ]),
    );

    let store = guest_store();
    store.save(&[CartItem::new("p1", 2)]).await.unwrap();

    let sync = CartSync::start(api(&backend), store.clone(), Session::guest(), config()).await;
    assert_eq!(sync.state().total_quantity(), 2);

    let outcome = sync.login(&credentials(PASSWORD)).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Merged { items: 2, pushed: true, .. }));
    assert!(sync.is_authenticated());

    assert_eq!(
        backend.cart(&user_id),
        json!([
            {"productId": "p1", "quantity": 3},
            {"productId": "p2", "quantity": 3}
        ])
    );
    assert!(store.load().await.unwrap().is_empty());

    // Populated product data survives adoption for display.
    let state = sync.state();
    let chai = state.items[0].product_ref.snapshot().unwrap();
    assert_eq!(chai.name.as_deref(), Some("Masala Chai"));

    cleanup(&store);
}

#[tokio::test]
async fn test_start_with_unreachable_backend_uses_guest_file() {
    let unreachable = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let api = HttpApi::with_base(
        url::Url::parse(&format!("http://{unreachable}")).unwrap(),
        Duration::from_secs(2),
    )
    .unwrap();

    let store = guest_store();
    store.save(&[CartItem::new("p7", 4)]).await.unwrap();

    let sync = CartSync::start(api, store.clone(), session_for("u1", "tok-u1"), config()).await;

    assert!(!sync.is_authenticated());
    assert!(sync.session().has_credentials());
    assert_eq!(sync.state().items, vec![CartItem::new("p7", 4)]);

    sync.add_item("p8", 1);
    assert!(sync.flush().await);
    assert_eq!(store.load().await.unwrap().len(), 2);

    cleanup(&store);
}

#[tokio::test]
async fn test_stored_session_adopts_account_cart_and_syncs_edits() {
    let backend = FakeBackend::spawn().await;
    let user_id = backend.add_account(EMAIL, PASSWORD, true);
    backend.set_cart(
        &user_id,
        json!([{"productId": {"productId": "p1"}, "quantity": 1}]),
    );
    let store = guest_store();

    let token = FakeBackend::token_for(&user_id);
    let sync = CartSync::start(api(&backend), store.clone(), session_for(&user_id, &token), config()).await;
    assert!(sync.is_authenticated());
    assert!(backend.pushes().is_empty());

    sync.add_item("p1", 1);
    sync.add_item("p2", 2);
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(backend.pushes().len(), 1);
    assert_eq!(
        backend.cart(&user_id),
        json!([
            {"productId": "p1", "quantity": 2},
            {"productId": "p2", "quantity": 2}
        ])
    );
    assert_eq!(store.load().await.unwrap().len(), 0);

    cleanup(&store);
}

#[tokio::test]
async fn test_rejected_token_falls_back_to_guest() {
    let backend = FakeBackend::spawn().await;
    let user_id = backend.add_account(EMAIL, PASSWORD, true);
    let store = guest_store();

    let sync = CartSync::start(
        api(&backend),
        store.clone(),
        session_for(&user_id, "expired"),
        config(),
    )
    .await;

    assert!(!sync.is_authenticated());
    assert!(!sync.session().has_credentials());

    cleanup(&store);
}

#[tokio::test]
async fn test_login_failures_are_reported() {
    let backend = FakeBackend::spawn().await;
    backend.add_account(EMAIL, PASSWORD, false);
    let store = guest_store();
    let sync = CartSync::start(api(&backend), store.clone(), Session::guest(), config()).await;

    let err = sync.login(&credentials("wrong")).await.unwrap_err();
    assert!(matches!(err, SyncError::Auth(AuthError::InvalidCredentials)));

    let err = sync.login(&credentials(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, SyncError::Auth(AuthError::EmailNotVerified)));
    assert!(!sync.is_authenticated());

    cleanup(&store);
}

#[tokio::test]
async fn test_logout_keeps_account_cart_on_server() {
    let backend = FakeBackend::spawn().await;
    let user_id = backend.add_account(EMAIL, PASSWORD, true);
    let store = guest_store();
    let sync = CartSync::start(api(&backend), store.clone(), Session::guest(), config()).await;
    sync.login(&credentials(PASSWORD)).await.unwrap();

    sync.add_item("p5", 1);
    sync.logout().await;

    assert!(sync.state().is_empty());
    assert_eq!(
        backend.cart(&user_id),
        json!([{"productId": "p5", "quantity": 1}])
    );
    assert!(store.load().await.unwrap().is_empty());

    cleanup(&store);
}

#[tokio::test]
async fn test_every_request_carries_a_unique_request_id() {
    let backend = FakeBackend::spawn().await;
    backend.add_account(EMAIL, PASSWORD, true);
    let store = guest_store();
    let sync = CartSync::start(api(&backend), store.clone(), Session::guest(), config()).await;

    sync.login(&credentials(PASSWORD)).await.unwrap();

    // login, fetch, push
    let ids = backend.request_ids();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);

    cleanup(&store);
}

#[tokio::test]
async fn test_signup_then_verify_then_login() {
    let backend = FakeBackend::spawn().await;
    let store = guest_store();
    let sync = CartSync::start(api(&backend), store.clone(), Session::guest(), config()).await;

    let registration = Registration::new("Asha", Email::parse(EMAIL).unwrap(), PASSWORD);
    let user = sync.register(&registration).await.unwrap();
    assert_eq!(user.email, EMAIL);
    assert!(!sync.is_authenticated());

    let err = sync.register(&registration).await.unwrap_err();
    assert!(matches!(err, SyncError::Auth(AuthError::AccountExists)));

    let err = sync.login(&credentials(PASSWORD)).await.unwrap_err();
    assert!(matches!(err, SyncError::Auth(AuthError::EmailNotVerified)));

    assert!(backend.verify_account(EMAIL));
    let outcome = sync.login(&credentials(PASSWORD)).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Merged { ref user, .. } if user.name == "Asha"));

    cleanup(&store);
}

#[tokio::test]
async fn test_restart_after_offline_login_merges_guest_file() {
    let backend = FakeBackend::spawn().await;
    let user_id = backend.add_account(EMAIL, PASSWORD, true);
    backend.set_cart(&user_id, json!([{"productId": "r1", "quantity": 1}]));
    let store = guest_store();
    store.save(&[CartItem::new("g1", 2)]).await.unwrap();

    backend.set_cart_unavailable(true);
    let sync = CartSync::start(api(&backend), store.clone(), Session::guest(), config()).await;
    let outcome = sync.login(&credentials(PASSWORD)).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Offline { .. }));
    let session = sync.session();
    drop(sync);

    backend.set_cart_unavailable(false);
    let sync = CartSync::start(api(&backend), store.clone(), session, config()).await;

    assert!(sync.is_authenticated());
    assert_eq!(
        backend.cart(&user_id),
        json!([
            {"productId": "r1", "quantity": 1},
            {"productId": "g1", "quantity": 2}
        ])
    );
    assert!(store.load().await.unwrap().is_empty());

    cleanup(&store);
}
