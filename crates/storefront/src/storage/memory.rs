//! In-memory store.

use std::sync::{Arc, Mutex, PoisonError};

use shopfront_core::CartItem;

use super::{FallbackStore, StorageError};

/// Guest cart held in process memory.
///
/// Clones share the same contents, so a handle kept outside the coordinator
/// observes its writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    items: Vec<CartItem>,
    saves: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `items`.
    #[must_use]
    pub fn with_items(items: Vec<CartItem>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner { items, saves: 0 })),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock().items.clone()
    }

    /// Number of completed `save` calls.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FallbackStore for MemoryStore {
    async fn load(&self) -> Result<Vec<CartItem>, StorageError> {
        Ok(self.items())
    }

    async fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.items = items.to_vec();
        inner.saves += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.lock().items.clear();
        Ok(())
    }
}
