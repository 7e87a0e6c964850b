//! Credential lookup trait and its in-memory implementation.
//!
//! # Usage
//!
//! ```no_run
//! // Demonstrates the trait interface; any store implementation works.
//! use realmkeep_storage::{RealmId, StorageError, UserId};
//! use realmkeep_storage::auth::{Credential, CredentialStore};
//!
//! async fn lookup<S: CredentialStore<UserId>>(
//!     store: &S,
//!     realm: RealmId,
//!     user: &UserId,
//! ) -> Result<Option<Credential<UserId>>, StorageError> {
//!     store.retrieve_credential_for(realm, user).await
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    auth::Credential,
    error::{StorageError, StorageResult},
    types::{Identity, RealmId},
};

/// Read access to stored credentials.
///
/// `Ok(None)` means the identity has no credential in that realm. Backend
/// failures are reported as errors, never folded into `None`, so callers
/// can tell "unknown identity" from "store unavailable".
#[async_trait]
pub trait CredentialStore<I: Identity>: Send + Sync {
    /// Fetches the credential of `id` in `realm_id`.
    async fn retrieve_credential_for(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<Credential<I>>>;
}

#[async_trait]
impl<I: Identity, S: CredentialStore<I> + ?Sized> CredentialStore<I> for Arc<S> {
    async fn retrieve_credential_for(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<Credential<I>>> {
        (**self).retrieve_credential_for(realm_id, id).await
    }
}

/// In-memory credential store.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct MemoryCredentialStore<I> {
    credentials: Arc<RwLock<HashMap<(RealmId, I), Credential<I>>>>,
}

impl<I: Identity> Default for MemoryCredentialStore<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Identity> MemoryCredentialStore<I> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { credentials: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Adds a credential.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the identity already has a
    /// credential in that realm.
    pub fn insert(&self, credential: Credential<I>) -> StorageResult<()> {
        let key = (credential.realm_id, credential.identity.clone());
        let mut credentials = self.credentials.write();
        if credentials.contains_key(&key) {
            return Err(StorageError::conflict(format!(
                "{}/{} {}",
                key.0,
                I::DOMAIN,
                key.1
            )));
        }
        credentials.insert(key, credential);
        Ok(())
    }

    /// Adds or replaces a credential.
    pub fn upsert(&self, credential: Credential<I>) {
        let key = (credential.realm_id, credential.identity.clone());
        self.credentials.write().insert(key, credential);
    }

    /// Removes a credential, returning it if present.
    pub fn remove(&self, realm_id: RealmId, id: &I) -> Option<Credential<I>> {
        self.credentials.write().remove(&(realm_id, id.clone()))
    }

    /// Flips the `active` flag. Returns `false` if no credential exists.
    pub fn set_active(&self, realm_id: RealmId, id: &I, active: bool) -> bool {
        match self.credentials.write().get_mut(&(realm_id, id.clone())) {
            Some(credential) => {
                credential.active = active;
                true
            },
            None => false,
        }
    }

    /// Number of stored credentials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }
}

#[async_trait]
impl<I: Identity> CredentialStore<I> for MemoryCredentialStore<I> {
    async fn retrieve_credential_for(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<Credential<I>>> {
        Ok(self.credentials.read().get(&(realm_id, id.clone())).cloned())
    }
}
