//! JSON file store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopfront_core::CartItem;
use tracing::{debug, instrument};

use super::{FallbackStore, StorageError};

const FORMAT_VERSION: u32 = 1;

/// Guest cart kept in a single JSON file.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous cart intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    items: &'a [CartItem],
}

/// Accepts the versioned envelope as well as a bare item array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCart {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        items: Vec<CartItem>,
    },
    Bare(Vec<CartItem>),
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl FallbackStore for FileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<CartItem>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let items = match serde_json::from_slice::<StoredCart>(&bytes)? {
            StoredCart::Versioned { items, .. } | StoredCart::Bare(items) => items,
        };
        debug!(items = items.len(), "Loaded guest cart");
        Ok(items)
    }

    #[instrument(skip(self, items), fields(path = %self.path.display(), items = items.len()))]
    async fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(&Envelope {
            version: FORMAT_VERSION,
            saved_at: Utc::now(),
            items,
        })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!("Saved guest cart");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
