//! Published cart state.

use serde::Serialize;
use shopfront_core::CartState;

/// Where the most recent change to the cart came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// A shopper action went through the reducer. Needs syncing.
    Local,
    /// State was adopted from the backend or guest storage. Already in sync.
    Remote,
}

/// One published version of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub state: CartState,
    /// Bumped on every change; never reused.
    pub revision: u64,
    pub origin: ChangeOrigin,
}

impl CartSnapshot {
    pub(crate) const fn initial() -> Self {
        Self {
            state: CartState::new(),
            revision: 0,
            origin: ChangeOrigin::Remote,
        }
    }

    /// Whether this snapshot should be written to the backend or guest storage.
    #[must_use]
    pub const fn needs_sync(&self) -> bool {
        matches!(self.origin, ChangeOrigin::Local)
    }
}
