//! Domain models for the storefront runtime.

pub mod session;

pub use session::{Credentials, CurrentUser, Registration, Session, StoredSession};
