//! Saved login session.

use std::io::ErrorKind;
use std::path::Path;

use shopfront_storefront::{Session, StoredSession};

/// Read the saved session, falling back to a guest session.
pub async fn load(path: &Path) -> Session {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Session::guest(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read session file, continuing as guest");
            return Session::guest();
        }
    };

    match serde_json::from_slice::<StoredSession>(&bytes) {
        Ok(stored) => Session::from(stored),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable session file");
            Session::guest()
        }
    }
}

/// Write the session back, or remove the file when there is nothing to keep.
pub async fn save(path: &Path, session: &Session) -> std::io::Result<()> {
    let Some(stored) = session.to_stored() else {
        return match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(&stored).map_err(std::io::Error::other)?;
    tokio::fs::write(path, body).await
}
