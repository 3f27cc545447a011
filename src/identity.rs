//! User identities and the external directory that resolves them.
//!
//! Accounts live in an external document store. warden only needs one query
//! from it: "find the account whose public handle equals this value". That
//! query is the [`UserDirectory`] trait. [`MemoryDirectory`] is an in-process
//! implementation for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A resolved account. Read-only within a request.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UserIdentity {
    pub id: String,
    /// URL-safe public key; also the canonical session identity.
    pub handle: String,
    pub email: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, handle: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: id.into(), handle: handle.into(), email: email.into() }
    }
}

/// Transport or storage fault of an external lookup. "Not found" is not an
/// error; lookups return `Ok(None)` for that.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// External account lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<UserIdentity>, LookupError>;
}

/// In-memory [`UserDirectory`].
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, UserIdentity>>,
    offline: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: UserIdentity) -> Self {
        self.insert(user);
        self
    }

    pub fn insert(&self, user: UserIdentity) {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(user.handle.clone(), user);
    }

    /// While offline every lookup fails with [`LookupError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_handle(&self, handle: &str) -> Result<Option<UserIdentity>, LookupError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(LookupError::Unavailable("directory offline".to_owned()));
        }
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(handle).cloned())
    }
}
