//! Shopfront Storefront - cart sync runtime.
//!
//! This crate keeps a shopper's cart consistent between the device and the
//! backend:
//! - [`remote`] - Backend collaborators and their HTTP implementation
//! - [`storage`] - Guest cart persistence
//! - [`sync`] - The coordinator tying reducer, debouncer, and stores together
//!
//! Pure cart logic (normalization, merge, reducer) lives in `shopfront-core`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod debounce;
pub mod error;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use config::{ConfigError, StorefrontConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use models::{Credentials, CurrentUser, Registration, Session, StoredSession};
pub use remote::{ApiError, AuthApi, AuthError, CartApi, HttpApi};
pub use storage::{FallbackStore, FileStore, MemoryStore, StorageError};
pub use sync::{CartSnapshot, CartSync, ChangeOrigin, LoginOutcome, OrderConfirmation};
