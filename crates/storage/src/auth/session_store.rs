//! Durable backing for authentication records.
//!
//! The realm manager keeps live records in a [`HybridCache`](crate::cache::HybridCache);
//! an [`AuthenticationStorage`] behind it lets records outlive cache
//! eviction and process restarts.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    auth::RealmAuthentication,
    error::StorageResult,
    types::{Identity, RealmId},
};

/// Persistence for [`RealmAuthentication`] records, keyed by realm and identity.
///
/// Each identity has at most one stored record per realm; `store` replaces.
#[async_trait]
pub trait AuthenticationStorage<I: Identity, T>: Send + Sync {
    /// Stores (or replaces) the record for its realm and identity.
    async fn store(&self, auth: &RealmAuthentication<I, T>) -> StorageResult<()>;

    /// Fetches the record for `id` in `realm_id`, expired or not.
    async fn retrieve(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<RealmAuthentication<I, T>>>;

    /// Deletes the record. Deleting a missing record succeeds.
    async fn remove(&self, realm_id: RealmId, id: &I) -> StorageResult<()>;
}

/// In-memory [`AuthenticationStorage`]. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryAuthenticationStorage<I, T> {
    records: Arc<RwLock<HashMap<(RealmId, I), RealmAuthentication<I, T>>>>,
}

impl<I: Identity, T> Default for MemoryAuthenticationStorage<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Identity, T> MemoryAuthenticationStorage<I, T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { records: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Number of stored records, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl<I, T> AuthenticationStorage<I, T> for MemoryAuthenticationStorage<I, T>
where
    I: Identity,
    T: Clone + Send + Sync + 'static,
{
    async fn store(&self, auth: &RealmAuthentication<I, T>) -> StorageResult<()> {
        self.records.write().insert((auth.realm_id(), auth.id().clone()), auth.clone());
        Ok(())
    }

    async fn retrieve(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<RealmAuthentication<I, T>>> {
        Ok(self.records.read().get(&(realm_id, id.clone())).cloned())
    }

    async fn remove(&self, realm_id: RealmId, id: &I) -> StorageResult<()> {
        self.records.write().remove(&(realm_id, id.clone()));
        Ok(())
    }
}
