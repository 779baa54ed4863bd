//! Cart synchronization between the in-memory cart and its stores.
//!
//! # Architecture
//!
//! - Shopper actions go through [`shopfront_core::reduce`] and are published
//!   on a `watch` channel as [`CartSnapshot`]s tagged [`ChangeOrigin::Local`]
//! - A background observer arms the [`Debouncer`] for every local change;
//!   when the cart has been quiet for the configured window the current
//!   items are pushed to the backend (logged in) or saved as the guest cart
//! - Carts read from the backend or guest storage are *adopted*: published
//!   with [`ChangeOrigin::Remote`] so the observer does not echo them back
//! - Pushes are serialized and always send the state current at send time
//! - A refresh is adopted only over a stored, unchanged revision
//!
//! Local state is the truth the shopper sees. A failed push or save is
//! logged and the cart is kept as is.
//!
//! # Example
//!
//! ```rust,ignore
//! let sync = CartSync::start(api, FileStore::new(path), session, config.sync).await;
//! sync.add_item("p1", 2);
//! sync.flush().await;
//! ```

mod checkout;
mod snapshot;


pub use checkout::OrderConfirmation;
pub use snapshot::{CartSnapshot, ChangeOrigin};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use shopfront_core::{
    CartAction, CartItem, CartState, CouponCode, ProductReference, merge, reduce,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::{Credentials, CurrentUser, Registration, Session};
use crate::remote::{AuthApi, CartApi};
use crate::storage::FallbackStore;

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Guest cart merged into the account cart.
    Merged {
        user: CurrentUser,
        /// Lines in the merged cart.
        items: usize,
        /// Whether the merged cart reached the backend.
        pushed: bool,
    },
    /// Credentials were accepted but the account cart could not be read.
    /// The guest cart stays in charge until the next successful start.
    Offline { user: CurrentUser },
}

// =============================================================================
// CartSync
// =============================================================================

/// Keeps the cart in sync with the backend or guest storage.
///
/// Cheap to clone; clones share the same cart.
pub struct CartSync<A, S> {
    inner: Arc<SyncInner<A, S>>,
}

impl<A, S> Clone for CartSync<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SyncInner<A, S> {
    api: A,
    store: S,
    config: SyncConfig,
    session: RwLock<Session>,
    cart: watch::Sender<CartSnapshot>,
    debouncer: Debouncer,
    /// Serializes pushes and saves.
    push_lock: tokio::sync::Mutex<()>,
    /// The guest store's items were merged into the account cart. The store
    /// is cleared once that cart reaches the backend.
    guest_folded: AtomicBool,
    /// Highest revision known to match what is stored.
    synced_revision: AtomicU64,
    observer: Mutex<Option<JoinHandle<()>>>,
}

impl<A, S> CartSync<A, S>
where
    A: CartApi + AuthApi,
    S: FallbackStore,
{
    /// Load the initial cart and begin watching for changes.
    ///
    /// A session with credentials is tried against the backend first. If
    /// the fetch fails the coordinator runs as a guest and adopts whatever
    /// the fallback store holds (an unreadable store yields an empty cart).
    /// A rejected session is forgotten; a network failure keeps the
    /// credentials so a later start can retry them.
    ///
    /// When a session is confirmed while the fallback store still holds a
    /// guest cart (a login that could not read the account cart, or edits
    /// made while the backend was down), the two are merged and pushed as
    /// on login.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(user_id))]
    pub async fn start(api: A, store: S, session: Session, config: SyncConfig) -> Self {
        let (cart, _) = watch::channel(CartSnapshot::initial());
        let inner = Arc::new(SyncInner {
            api,
            store,
            config,
            session: RwLock::new(session),
            cart,
            debouncer: Debouncer::new(config.debounce),
            push_lock: tokio::sync::Mutex::new(()),
            guest_folded: AtomicBool::new(false),
            synced_revision: AtomicU64::new(0),
            observer: Mutex::new(None),
        });

        inner.load_initial().await;

        let observer = spawn_observer(&inner);
        *inner.observer.lock().unwrap_or_else(PoisonError::into_inner) = Some(observer);

        Self { inner }
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// The current cart with its revision and origin.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.cart.borrow().clone()
    }

    /// The current cart.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.cart.borrow().state.clone()
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.cart.subscribe()
    }

    /// A copy of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session().is_authenticated()
    }

    /// Whether a change is waiting out the quiet period.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    // =========================================================================
    // Shopper Actions
    // =========================================================================

    /// Apply a shopper action. Returns at once; syncing happens later.
    pub fn dispatch(&self, action: CartAction) {
        let kind = action.kind();
        self.apply(kind, |state| reduce(state, action));
    }

    /// Publish `change` of the current state as a shopper change.
    ///
    /// Nothing is published when the state comes back equal.
    fn apply(&self, kind: &'static str, change: impl FnOnce(CartState) -> CartState) -> bool {
        let changed = self.inner.cart.send_if_modified(|snapshot| {
            let next = change(snapshot.state.clone());
            if next == snapshot.state {
                return false;
            }
            snapshot.state = next;
            snapshot.revision += 1;
            snapshot.origin = ChangeOrigin::Local;
            true
        });

        if changed {
            add_breadcrumb("cart", kind, None);
            debug!(action = kind, "Cart changed");
        }
        changed
    }

    pub fn add_item(&self, product: impl Into<ProductReference>, quantity: u32) {
        self.dispatch(CartAction::AddItem(CartItem::new(product, quantity)));
    }

    pub fn remove_item(&self, product: impl Into<ProductReference>) {
        self.dispatch(CartAction::RemoveItem(product.into()));
    }

    /// Set a line's quantity exactly. A quantity of 0 keeps the line.
    pub fn update_quantity(&self, product: impl Into<ProductReference>, quantity: u32) {
        self.dispatch(CartAction::UpdateQuantity {
            product_ref: product.into(),
            quantity,
        });
    }

    pub fn apply_coupon(&self, code: impl Into<String>) {
        self.dispatch(CartAction::ApplyCoupon(CouponCode::new(code)));
    }

    pub fn clear(&self) {
        self.dispatch(CartAction::ClearCart);
    }

    // =========================================================================
    // Sync Operations
    // =========================================================================

    /// Skip the quiet period and sync the current cart now.
    ///
    /// Returns `false` if the push or save failed.
    pub async fn flush(&self) -> bool {
        self.inner.debouncer.cancel();
        self.inner.sync_current(false).await.is_stored()
    }

    /// Re-read the account cart and adopt it.
    ///
    /// Returns `Ok(false)` without adopting when there is no authenticated
    /// session, or when the cart holds changes that are not yet stored or
    /// changed while the fetch was running, since those would be
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Api` if the fetch fails. A rejected session is
    /// downgraded to guest mode first.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<bool> {
        let session = self.inner.session();
        if !session.is_authenticated() {
            return Ok(false);
        }

        let seen = self.inner.cart.borrow().revision;
        let items = match self.inner.api.fetch_cart(&session).await {
            Ok(items) => items,
            Err(e) => {
                if e.is_auth_failure() {
                    warn!(error = %e, "Session rejected on refresh, continuing as guest");
                    self.inner.downgrade_session();
                }
                return Err(e.into());
            }
        };

        let Some(revision) = self.inner.adopt_items_over(items, seen) else {
            debug!(seen, "Local changes outstanding, not adopting refreshed cart");
            return Ok(false);
        };
        self.inner.mark_synced(revision);
        Ok(true)
    }

    /// Log in and fold the guest cart into the account cart.
    ///
    /// The account cart is fetched and merged with the in-memory guest cart
    /// (quantities summed), the result is adopted and pushed, and the guest
    /// storage is cleared once the merged cart reaches the backend. A failed
    /// push is logged and the merged cart is kept; the next change retries.
    /// If the backend rejects the push, the merged cart is saved as the
    /// guest cart instead.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Auth` if the credentials are rejected. The cart
    /// and session are unchanged in that case.
    #[instrument(skip(self, credentials), fields(email = %credentials.email, user_id))]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        if self.is_authenticated() {
            self.logout().await;
        }

        let session = self.inner.api.login(credentials).await?;
        let Some(user) = session.user().cloned() else {
            return Err(crate::remote::AuthError::InvalidCredentials.into());
        };
        tracing::Span::current().record("user_id", user.id.as_str());
        set_sentry_user(&user.id, Some(user.email.as_str()));

        let remote = match self.inner.api.fetch_cart(&session).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Account cart unavailable, keeping guest cart");
                let mut offline = session;
                if e.is_auth_failure() {
                    offline.downgrade();
                } else {
                    offline.suspend();
                }
                *self.inner.session_mut() = offline;
                return Ok(LoginOutcome::Offline { user });
            }
        };

        *self.inner.session_mut() = session;

        let guest = self.state().items;
        let guest_lines = guest.len();
        let merged = merge(remote, guest);
        let items = merged.len();
        self.inner.adopt_items(merged);
        self.inner.guest_folded.store(true, Ordering::Release);
        info!(guest_lines, items, "Merged guest cart into account cart");

        let pushed = self.inner.sync_current(true).await == SyncOutcome::Pushed;

        Ok(LoginOutcome::Merged {
            user,
            items,
            pushed,
        })
    }

    /// Create an account. The session and cart are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Auth` if the email is taken or the backend
    /// cannot be reached.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<CurrentUser> {
        let user = self.inner.api.register(registration).await?;
        add_breadcrumb("auth", "Account created", None);
        info!(user_id = %user.id, "Account created, awaiting email verification");
        Ok(user)
    }

    /// Sync pending edits, then return to an empty guest cart.
    ///
    /// The account cart stays on the backend as it was last pushed. Nothing
    /// is written for the emptied view.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.flush().await;
        self.inner.downgrade_session();
        self.inner.guest_folded.store(false, Ordering::Release);
        let revision = self.inner.adopt(CartState::new());
        self.inner.mark_synced(revision);
        info!("Logged out");
    }
}

// =============================================================================
// SyncInner
// =============================================================================

impl<A, S> SyncInner<A, S>
where
    A: CartApi + AuthApi,
    S: FallbackStore,
{
    fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn session_mut(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn downgrade_session(&self) {
        self.session_mut().downgrade();
        clear_sentry_user();
    }

    fn confirm_session(&self) {
        let mut confirmed = self.session_mut();
        confirmed.confirm();
        if let Some(user) = confirmed.user() {
            tracing::Span::current().record("user_id", user.id.as_str());
            set_sentry_user(&user.id, Some(user.email.as_str()));
        }
    }

    fn mark_synced(&self, revision: u64) {
        self.synced_revision.fetch_max(revision, Ordering::AcqRel);
    }

    async fn load_initial(&self) {
        let session = self.session();
        if session.has_credentials() {
            match self.api.fetch_cart(&session).await {
                Ok(items) => {
                    self.confirm_session();

                    let guest = self.load_guest().await;
                    if guest.is_empty() {
                        let revision = self.adopt_items(items);
                        self.mark_synced(revision);
                        info!(revision, "Adopted account cart");
                    } else {
                        let guest_lines = guest.len();
                        self.adopt_items(merge(items, guest));
                        self.guest_folded.store(true, Ordering::Release);
                        let outcome = self.sync_current(true).await;
                        info!(guest_lines, ?outcome, "Merged stored guest cart into account cart");
                    }
                    return;
                }
                Err(e) if e.is_auth_failure() => {
                    warn!(error = %e, "Stored session rejected, continuing as guest");
                    self.downgrade_session();
                }
                Err(e) => {
                    warn!(error = %e, "Account cart unavailable, continuing as guest");
                    self.session_mut().suspend();
                }
            }
        }

        let items = self.load_guest().await;
        let revision = self.adopt_items(items);
        self.mark_synced(revision);
        info!(revision, "Adopted guest cart");
    }

    async fn load_guest(&self) -> Vec<CartItem> {
        self.store.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load guest cart, starting empty");
            Vec::new()
        })
    }

    /// Replace the cart without treating it as a shopper change.
    fn adopt(&self, state: CartState) -> u64 {
        self.debouncer.cancel();
        let mut revision = 0;
        self.cart.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.revision += 1;
            snapshot.origin = ChangeOrigin::Remote;
            revision = snapshot.revision;
        });
        revision
    }

    /// Adopt loaded items, keeping the current coupon.
    fn adopt_items(&self, items: Vec<CartItem>) -> u64 {
        let items = settle_items(items);
        let coupon = self.cart.borrow().state.coupon.clone();
        self.adopt(CartState { items, coupon })
    }

    /// Adopt loaded items only if the cart is still at revision `seen` and
    /// that revision is stored. Returns the new revision when adopted.
    fn adopt_items_over(&self, items: Vec<CartItem>, seen: u64) -> Option<u64> {
        let items = settle_items(items);
        let synced = self.synced_revision.load(Ordering::Acquire);
        let mut adopted = None;
        self.cart.send_if_modified(|snapshot| {
            if snapshot.revision != seen || seen > synced {
                return false;
            }
            snapshot.state.items = items;
            snapshot.revision += 1;
            snapshot.origin = ChangeOrigin::Remote;
            adopted = Some(snapshot.revision);
            true
        });
        if adopted.is_some() {
            self.debouncer.cancel();
        }
        adopted
    }

    /// Write the current cart to the backend or the guest store.
    ///
    /// Skips the write when the current revision is already stored, unless
    /// `force` is set.
    async fn sync_current(&self, force: bool) -> SyncOutcome {
        let _serial = self.push_lock.lock().await;

        let snapshot = self.cart.borrow().clone();
        let revision = snapshot.revision;
        if !force && revision <= self.synced_revision.load(Ordering::Acquire) {
            debug!(revision, "Cart already synced");
            return SyncOutcome::Current;
        }

        let items = snapshot.state.items;
        let session = self.session();

        if session.is_authenticated() {
            match self.api.push_cart(&session, &items).await {
                Ok(()) => {
                    self.mark_synced(revision);
                    info!(revision, items = items.len(), "Pushed cart");
                    if self.guest_folded.swap(false, Ordering::AcqRel) {
                        if let Err(e) = self.store.clear().await {
                            warn!(error = %e, "Failed to clear merged guest cart");
                        }
                    }
                    return SyncOutcome::Pushed;
                }
                Err(e) if e.is_auth_failure() => {
                    warn!(error = %e, "Session rejected on push, saving as guest cart");
                    self.downgrade_session();
                }
                Err(e) => {
                    warn!(error = %e, revision, "Failed to push cart, keeping local state");
                    return SyncOutcome::Failed;
                }
            }
        }

        match self.store.save(&items).await {
            Ok(()) => {
                self.guest_folded.store(false, Ordering::Release);
                self.mark_synced(revision);
                debug!(revision, items = items.len(), "Saved guest cart");
                SyncOutcome::Saved
            }
            Err(e) => {
                warn!(error = %e, revision, "Failed to save guest cart, keeping local state");
                SyncOutcome::Failed
            }
        }
    }
}

impl<A, S> Drop for SyncInner<A, S> {
    fn drop(&mut self) {
        if let Some(observer) = self
            .observer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            observer.abort();
        }
    }
}

/// Where a sync attempt left the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncOutcome {
    /// Nothing to write.
    Current,
    Pushed,
    /// Written to the fallback store.
    Saved,
    Failed,
}

impl SyncOutcome {
    const fn is_stored(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Put loaded references in display shape and collapse lines that share a
/// canonical id.
fn settle_items(items: Vec<CartItem>) -> Vec<CartItem> {
    merge(Vec::new(), items.into_iter().map(CartItem::canonical).collect())
}

/// Watch the cart and arm the debouncer for every local change.
///
/// Adopted snapshots are consumed without scheduling anything. The task
/// holds only weak references and ends when the coordinator is dropped.
fn spawn_observer<A, S>(inner: &Arc<SyncInner<A, S>>) -> JoinHandle<()>
where
    A: CartApi + AuthApi,
    S: FallbackStore,
{
    let mut changes = inner.cart.subscribe();
    let weak = Arc::downgrade(inner);

    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let (origin, revision) = {
                let snapshot = changes.borrow_and_update();
                (snapshot.origin, snapshot.revision)
            };
            let Some(inner) = weak.upgrade() else {
                break;
            };

            match origin {
                ChangeOrigin::Remote => debug!(revision, "Adopted cart observed, nothing to sync"),
                ChangeOrigin::Local => {
                    let target: Weak<SyncInner<A, S>> = Arc::downgrade(&inner);
                    inner.debouncer.schedule(async move {
                        if let Some(inner) = target.upgrade() {
                            inner.sync_current(false).await;
                        }
                    });
                }
            }
        }
    })
}
