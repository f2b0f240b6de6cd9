//! Session store: the bearer token and the cached user profile.
//!
//! # Design
//! The session lives in two keys of a `KeyValueStore`: `authToken` holds the
//! raw token, `user` holds the profile as JSON. The store is the only owner of
//! the credential; the client reads it afresh for every outbound request.
//!
//! Reads never fail. A malformed cached profile reads as absent. Write failures
//! are logged and swallowed, since a failed persist must not turn a successful
//! login into an error.

use std::sync::Arc;

use tracing::warn;

use crate::storage::{KeyValueStore, MemoryStorage, StorageError};
use crate::types::User;

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";

/// Point-in-time copy of both session keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Establish a session. Both keys are always written together.
    pub fn set_session(&self, token: &str, user: &User) {
        self.write(TOKEN_KEY, token);
        self.write_user(user);
    }

    /// Replace the cached profile without touching the token.
    pub fn update_cached_user(&self, user: &User) {
        self.write_user(user);
    }

    /// Replace the token without touching the cached profile.
    pub fn set_token(&self, token: &str) {
        self.write(TOKEN_KEY, token);
    }

    /// Remove both keys. Clearing an empty session is a no-op.
    pub fn clear_session(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove_item(key) {
                log_write_failure(key, &e);
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY)
    }

    pub fn user(&self) -> Option<User> {
        let raw = self.storage.get_item(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "cached user record is malformed; treating as absent");
                None
            }
        }
    }

    /// True iff a token is stored. Says nothing about server-side validity.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn snapshot(&self) -> Session {
        Session {
            token: self.token(),
            user: self.user(),
        }
    }

    fn write_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(json) => self.write(USER_KEY, &json),
            Err(e) => warn!(error = %e, "could not serialize user for the session cache"),
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set_item(key, value) {
            log_write_failure(key, &e);
        }
    }
}

fn log_write_failure(key: &str, error: &StorageError) {
    warn!(key, error = %error, "session storage write failed");
}
