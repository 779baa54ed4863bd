//! Session-related types.
//!
//! A [`Session`] is what the sync coordinator consults to decide whether a
//! cart change goes to the backend or to guest storage.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId};

/// Identity of the logged-in shopper, as reported by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user id; keys the remote cart.
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Authentication state.
///
/// The token never appears in `Debug` output.
#[derive(Debug, Clone, Default)]
pub struct Session {
    authenticated: bool,
    token: Option<SecretString>,
    user: Option<CurrentUser>,
}

impl Session {
    /// A guest session with no credentials.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            authenticated: false,
            token: None,
            user: None,
        }
    }

    /// A session that has just been established by a successful login.
    #[must_use]
    pub fn authenticated(token: SecretString, user: CurrentUser) -> Self {
        Self {
            authenticated: true,
            token: Some(token),
            user: Some(user),
        }
    }

    /// Credentials restored from disk that still need to be confirmed by a
    /// successful remote fetch.
    #[must_use]
    pub fn unverified(token: SecretString, user: CurrentUser) -> Self {
        Self {
            authenticated: false,
            token: Some(token),
            user: Some(user),
        }
    }

    /// True only when the flag is set and both token and user are present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated && self.token.is_some() && self.user.is_some()
    }

    /// True when there is something to try against the backend.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|user| &user.id)
    }

    /// Mark the credentials as confirmed by the backend.
    pub const fn confirm(&mut self) {
        self.authenticated = self.token.is_some() && self.user.is_some();
    }

    /// Drop to guest mode but keep the credentials for a later retry.
    pub const fn suspend(&mut self) {
        self.authenticated = false;
    }

    /// Drop to guest mode, forgetting token and user.
    pub fn downgrade(&mut self) {
        *self = Self::guest();
    }

    /// Serializable copy for the CLI session file.
    #[must_use]
    pub fn to_stored(&self) -> Option<StoredSession> {
        let token = self.token.as_ref()?;
        let user = self.user.clone()?;
        Some(StoredSession {
            token: token.expose_secret().to_string(),
            user,
        })
    }
}

/// On-disk form of a session.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: CurrentUser,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self::unverified(SecretString::from(stored.token), stored.user)
    }
}

/// Email and password for the login endpoint.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: Email, password: impl Into<String>) -> Self {
        Self {
            email,
            password: SecretString::from(password.into()),
        }
    }
}

/// Details for creating an account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
}

impl Registration {
    #[must_use]
    pub fn new(name: &str, email: Email, password: impl Into<String>) -> Self {
        Self {
            name: name.trim().to_string(),
            email,
            password: SecretString::from(password.into()),
        }
    }
}
