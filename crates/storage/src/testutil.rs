//! Shared test utilities for credential stores and the session cache.
//!
//! Feature-gated behind `testutil` so none of it leaks into production
//! builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! realmkeep-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use realmkeep_storage::testutil::{FailingCredentialStore, make_credential};
//! ```

use std::{
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    auth::{
        AuthenticationStorage, Credential, CredentialStore, EncryptedSecret,
        MemoryAuthenticationStorage, RealmAuthentication,
    },
    cache::{HybridCache, HybridCacheConfig},
    error::{StorageError, StorageResult},
    types::{Identity, RealmId},
};

/// Builds an active credential whose secret is salted SHA-256 of `secret`.
///
/// SHA-256 keeps test suites fast; use
/// [`EncryptedSecret::hash_argon2id`] where the scheme itself is under test.
#[must_use]
pub fn make_credential<I: Identity>(
    realm_id: RealmId,
    identity: I,
    secret: &str,
) -> Credential<I> {
    Credential::builder()
        .realm_id(realm_id)
        .identity(identity)
        .secret(EncryptedSecret::hash_sha256(secret.as_bytes()))
        .build()
}

/// Builds a cache with the given capacity and trim target and a long sweep
/// interval, so tests drive expiry explicitly.
///
/// # Panics
///
/// Panics if `trim_target >= capacity`.
#[must_use]
pub fn small_cache<K, V>(capacity: usize, trim_target: usize) -> HybridCache<K, V>
where
    K: Eq + std::hash::Hash + Ord + Clone,
    V: Clone,
{
    let config = HybridCacheConfig::builder()
        .capacity(capacity)
        .trim_target(trim_target)
        .sweep_interval(Duration::from_secs(3_600))
        .build()
        .expect("valid test cache config");
    HybridCache::new(config)
}

/// How a failure-injecting store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Return [`StorageError::Connection`].
    Connection,
    /// Return [`StorageError::Timeout`].
    Timeout,
    /// Sleep this long, then answer normally.
    Delay(Duration),
}

impl InjectedFailure {
    async fn apply(self, context: &str) -> StorageResult<()> {
        match self {
            Self::Connection => {
                Err(StorageError::connection(format!("injected connection failure: {context}")))
            },
            Self::Timeout => Err(StorageError::timeout()),
            Self::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            },
        }
    }
}

/// A [`CredentialStore`] wrapper that fails on demand.
///
/// While [`failing`](Self::set_failing) is on, every lookup applies the
/// configured [`InjectedFailure`] before (or instead of) delegating.
pub struct FailingCredentialStore<S> {
    inner: S,
    failure: InjectedFailure,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl<S> FailingCredentialStore<S> {
    /// Wraps `inner`; failures start switched on.
    pub fn new(inner: S, failure: InjectedFailure) -> Self {
        Self { inner, failure, failing: AtomicBool::new(true), lookups: AtomicUsize::new(0) }
    }

    /// Switches failure injection on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of lookups received, failed or not.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I: Identity, S: CredentialStore<I>> CredentialStore<I> for FailingCredentialStore<S> {
    async fn retrieve_credential_for(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<Credential<I>>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            self.failure.apply("retrieve_credential_for").await?;
        }
        self.inner.retrieve_credential_for(realm_id, id).await
    }
}

/// An [`AuthenticationStorage`] whose every operation fails with
/// [`StorageError::Connection`], counting calls.
#[derive(Debug)]
pub struct UnavailableAuthenticationStorage<T> {
    calls: Arc<AtomicUsize>,
    _token: PhantomData<fn() -> T>,
}

impl<T> Default for UnavailableAuthenticationStorage<T> {
    fn default() -> Self {
        Self { calls: Arc::new(AtomicUsize::new(0)), _token: PhantomData }
    }
}

impl<T> UnavailableAuthenticationStorage<T> {
    /// Creates a store that always fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, op: &str) -> StorageError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StorageError::connection(format!("authentication storage unavailable: {op}"))
    }
}

#[async_trait]
impl<I: Identity, T: Send + Sync + 'static> AuthenticationStorage<I, T>
    for UnavailableAuthenticationStorage<T>
{
    async fn store(&self, _auth: &RealmAuthentication<I, T>) -> StorageResult<()> {
        Err(self.fail("store"))
    }

    async fn retrieve(
        &self,
        _realm_id: RealmId,
        _id: &I,
    ) -> StorageResult<Option<RealmAuthentication<I, T>>> {
        Err(self.fail("retrieve"))
    }

    async fn remove(&self, _realm_id: RealmId, _id: &I) -> StorageResult<()> {
        Err(self.fail("remove"))
    }
}

/// A [`MemoryAuthenticationStorage`] that can park the next `store` or
/// `retrieve` call until released, for interleaving session operations.
///
/// ```text
/// arm() ─► next store/retrieve parks ─► wait_entered() returns ─► release()
/// ```
pub struct GatedAuthenticationStorage<I, T> {
    inner: MemoryAuthenticationStorage<I, T>,
    armed: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl<I: Identity, T> Default for GatedAuthenticationStorage<I, T> {
    fn default() -> Self {
        Self {
            inner: MemoryAuthenticationStorage::new(),
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            released: Notify::new(),
        }
    }
}

impl<I: Identity, T> GatedAuthenticationStorage<I, T> {
    /// Creates an open gate over an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the next `store` or `retrieve` call.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Waits until an armed call has parked.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the parked call proceed.
    pub fn release(&self) {
        self.released.notify_one();
    }

    /// The backing store.
    pub fn inner(&self) -> &MemoryAuthenticationStorage<I, T> {
        &self.inner
    }

    async fn gate(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
    }
}

#[async_trait]
impl<I, T> AuthenticationStorage<I, T> for GatedAuthenticationStorage<I, T>
where
    I: Identity,
    T: Clone + Send + Sync + 'static,
{
    async fn store(&self, auth: &RealmAuthentication<I, T>) -> StorageResult<()> {
        self.gate().await;
        self.inner.store(auth).await
    }

    async fn retrieve(
        &self,
        realm_id: RealmId,
        id: &I,
    ) -> StorageResult<Option<RealmAuthentication<I, T>>> {
        self.gate().await;
        self.inner.retrieve(realm_id, id).await
    }

    async fn remove(&self, realm_id: RealmId, id: &I) -> StorageResult<()> {
        self.inner.remove(realm_id, id).await
    }
}

/// Assert that a [`StorageResult`] is `Ok`, returning the inner value.
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use realmkeep_storage::{assert_storage_ok, StorageResult};
///
/// let result: StorageResult<i32> = Ok(42);
/// assert_eq!(assert_storage_ok!(result), 42);
/// ```
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Assert that a [`StorageResult`] contains a [`StorageError::Timeout`].
#[macro_export]
macro_rules! assert_timeout {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Timeout)),
            "expected StorageError::Timeout, got: {:?}",
            $result,
        );
    };
}

/// Assert that a cache insert was refused with `CapacityExhausted`.
#[macro_export]
macro_rules! assert_capacity_exhausted {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::CacheError::CapacityExhausted { .. })),
            "expected CacheError::CapacityExhausted, got: {:?}",
            $result,
        );
    };
}
