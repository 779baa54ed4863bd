//! Guest cart storage.
//!
//! While nobody is logged in the cart lives only on this device. A
//! [`FallbackStore`] holds it between runs; on login its contents are merged
//! into the remote cart and the store is cleared.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;

use shopfront_core::CartItem;
use thiserror::Error;

/// Errors that can occur reading or writing the guest cart.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored cart is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local persistence for the guest cart.
pub trait FallbackStore: Send + Sync + 'static {
    /// Read the saved items. A store that was never written yields an empty list.
    fn load(&self) -> impl Future<Output = Result<Vec<CartItem>, StorageError>> + Send;

    /// Replace the saved items.
    fn save(&self, items: &[CartItem]) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Forget the saved items.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}
