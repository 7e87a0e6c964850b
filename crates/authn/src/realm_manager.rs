//! Realm session management for peers and users.
//!
//! A [`RealmManager`] owns two independent [`RealmDomain`]s, one for peers
//! and one for users. Each domain pairs a [`SecretValidator`] with a
//! [`HybridCache`] of live [`RealmAuthentication`] records keyed by
//! `(realm, identity)`, and optionally an [`AuthenticationStorage`] that
//! keeps sessions across cache eviction and restarts.
//!
//! # Session Lifecycle
//!
//! ```text
//!                    authenticate (secret ok)
//! ┌─────────────────┐ ─────────────────────────► ┌───────────────┐
//! │ Unauthenticated │                            │ Authenticated │ ◄─┐ renew
//! └─────────────────┘ ◄───────────────────────── └───────────────┘ ──┘
//!                     expiry · remove_from_realm ·
//!                     token replayed from another address
//! ```
//!
//! A token that does not belong to the session is refused without touching
//! the session, so knowing an identity is not enough to log it out.
//!
//! # Concurrency
//!
//! State changes of one `(realm, identity)` key (commit of `authenticate`,
//! `renew`, recovery from durable storage, invalidation and revocation) run
//! under a per-key async lock held across the storage calls. A revocation
//! therefore takes effect after any renewal or recovery already in flight
//! and is never undone by it.
//!
//! # Audit Events
//!
//! Session creation, failed authentication, renewal, revocation,
//! invalidation and capacity rejection emit an `audit_event` with
//! `audit.action`, `audit.resource` (`realm:{realm}/{domain}:{id}`) and
//! `audit.result` fields.

use std::{
    hash::{BuildHasher, Hash, RandomState},
    net::IpAddr,
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use realmkeep_storage::{
    ConfigError, HybridCache, HybridCacheConfig, Identity, PeerId, RealmId, UserId,
    auth::{
        AuthToken, AuthenticationStorage, CredentialStore, DEFAULT_EXTENSION_TIME,
        RealmAuthentication,
    },
    cache::{CacheStatsSnapshot, DEFAULT_SWEEP_INTERVAL},
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    error::AuthError,
    validator::{CredentialValidator, SecretValidator},
};

/// Lifetime of a freshly issued session (30 minutes).
pub const DEFAULT_EXPIRES: Duration = Duration::from_secs(1_800);

/// Default per-domain session cache capacity.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 10_000;

/// Headroom between cache capacity and its trim target.
pub const CACHE_TRIM_MARGIN: usize = 10;

/// Default protection window before a session may be LRU-evicted.
pub const DEFAULT_SESSION_MIN_LIVE: Duration = Duration::from_secs(1);

/// Session lifetime and cache sizing shared by both domains.
///
/// # Validation
///
/// - `max_cache_size` must be greater than 10 (the trim target is `max_cache_size - 10`)
/// - `session_lifetime` and `extension_time` must be non-zero
/// - `sweep_interval` must be at least 10ms
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use realmkeep_authn::RealmManagerConfig;
///
/// let config = RealmManagerConfig::builder()
///     .max_cache_size(500)
///     .session_lifetime(Duration::from_secs(600))
///     .build()
///     .expect("valid config");
/// assert_eq!(config.cache_config().expect("valid").trim_target(), 490);
///
/// assert!(RealmManagerConfig::builder().max_cache_size(10).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRealmManagerConfig", into = "RawRealmManagerConfig")]
pub struct RealmManagerConfig {
    max_cache_size: usize,
    session_lifetime: Duration,
    extension_time: Duration,
    sweep_interval: Duration,
    min_live: Duration,
}

#[bon::bon]
impl RealmManagerConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any bound listed on the type is violated.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MAX_CACHE_SIZE)] max_cache_size: usize,
        #[builder(default = DEFAULT_EXPIRES)] session_lifetime: Duration,
        #[builder(default = DEFAULT_EXTENSION_TIME)] extension_time: Duration,
        #[builder(default = DEFAULT_SWEEP_INTERVAL)] sweep_interval: Duration,
        #[builder(default = DEFAULT_SESSION_MIN_LIVE)] min_live: Duration,
    ) -> Result<Self, ConfigError> {
        if max_cache_size <= CACHE_TRIM_MARGIN {
            return Err(ConfigError::BelowMinimum {
                field: "max_cache_size",
                value: max_cache_size.to_string(),
                min: (CACHE_TRIM_MARGIN + 1).to_string(),
            });
        }
        let windows = [("session_lifetime", session_lifetime), ("extension_time", extension_time)];
        for (field, value) in windows {
            if value.is_zero() {
                return Err(ConfigError::BelowMinimum {
                    field,
                    value: "0s".to_owned(),
                    min: "1ns".to_owned(),
                });
            }
        }
        let config =
            Self { max_cache_size, session_lifetime, extension_time, sweep_interval, min_live };
        // Surface cache-level violations (sweep interval floor) at construction.
        config.cache_config()?;
        Ok(config)
    }

    /// Per-domain session cache capacity.
    #[must_use]
    pub fn max_cache_size(&self) -> usize {
        self.max_cache_size
    }

    /// Lifetime of a freshly issued session.
    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        self.session_lifetime
    }

    /// Window each renewal extends a session to.
    #[must_use]
    pub fn extension_time(&self) -> Duration {
        self.extension_time
    }

    /// Interval between expired-session sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Protection window before a session is eligible for LRU eviction.
    #[must_use]
    pub fn min_live(&self) -> Duration {
        self.min_live
    }

    /// The cache configuration each domain is built with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the derived cache settings are invalid.
    pub fn cache_config(&self) -> Result<HybridCacheConfig, ConfigError> {
        HybridCacheConfig::builder()
            .capacity(self.max_cache_size)
            .trim_target(self.max_cache_size - CACHE_TRIM_MARGIN)
            .sweep_interval(self.sweep_interval)
            .min_live(self.min_live)
            .build()
    }
}

impl Default for RealmManagerConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            session_lifetime: DEFAULT_EXPIRES,
            extension_time: DEFAULT_EXTENSION_TIME,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            min_live: DEFAULT_SESSION_MIN_LIVE,
        }
    }
}

/// Unvalidated wire form of [`RealmManagerConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRealmManagerConfig {
    max_cache_size: usize,
    #[serde(with = "humantime_serde")]
    session_lifetime: Duration,
    #[serde(with = "humantime_serde")]
    extension_time: Duration,
    #[serde(with = "humantime_serde")]
    sweep_interval: Duration,
    #[serde(with = "humantime_serde")]
    min_live: Duration,
}

impl Default for RawRealmManagerConfig {
    fn default() -> Self {
        RealmManagerConfig::default().into()
    }
}

impl TryFrom<RawRealmManagerConfig> for RealmManagerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRealmManagerConfig) -> Result<Self, Self::Error> {
        Self::builder()
            .max_cache_size(raw.max_cache_size)
            .session_lifetime(raw.session_lifetime)
            .extension_time(raw.extension_time)
            .sweep_interval(raw.sweep_interval)
            .min_live(raw.min_live)
            .build()
    }
}

impl From<RealmManagerConfig> for RawRealmManagerConfig {
    fn from(config: RealmManagerConfig) -> Self {
        Self {
            max_cache_size: config.max_cache_size,
            session_lifetime: config.session_lifetime,
            extension_time: config.extension_time,
            sweep_interval: config.sweep_interval,
            min_live: config.min_live,
        }
    }
}

type SessionKey<I> = (RealmId, I);
type SessionCache<I, T> = HybridCache<SessionKey<I>, RealmAuthentication<I, T>>;

/// Number of lock stripes per domain.
const SESSION_LOCK_STRIPES: usize = 64;

/// Striped async locks serializing state changes of a session key.
struct SessionLocks {
    stripes: Box<[Mutex<()>]>,
    hasher: RandomState,
}

impl SessionLocks {
    fn new() -> Self {
        Self {
            stripes: (0..SESSION_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    async fn lock<K: Hash>(&self, key: &K) -> MutexGuard<'_, ()> {
        let slot = (self.hasher.hash_one(key) % self.stripes.len() as u64) as usize;
        self.stripes[slot].lock().await
    }
}

/// How a presented token relates to a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Live session, matching token and address.
    Valid,
    /// The session's deadline has passed.
    Expired,
    /// The session's own token, presented from another address.
    Relocated,
    /// A token that does not belong to the session.
    Foreign,
}

impl Verdict {
    fn of<I, T: ConstantTimeEq>(
        session: &RealmAuthentication<I, T>,
        token: &T,
        client_address: &IpAddr,
    ) -> Self {
        if session.is_authenticated(token, client_address) {
            Self::Valid
        } else if session.is_expired() {
            Self::Expired
        } else if bool::from(session.token().ct_eq(token)) {
            Self::Relocated
        } else {
            Self::Foreign
        }
    }
}

/// Sessions for one identity domain (peers or users).
///
/// Construct through [`RealmManager`] or directly with [`RealmDomain::new`].
/// When created inside a Tokio runtime the cache sweeper starts
/// immediately; otherwise call [`start_sweeper`](Self::start_sweeper) once
/// a runtime is available.
pub struct RealmDomain<I: Identity, T> {
    validator: Arc<dyn SecretValidator<I, T>>,
    cache: Arc<SessionCache<I, T>>,
    storage: Option<Arc<dyn AuthenticationStorage<I, T>>>,
    locks: SessionLocks,
    session_lifetime: Duration,
    extension_time: Duration,
}

impl<I, T> RealmDomain<I, T>
where
    I: Identity,
    T: Clone + ConstantTimeEq + Send + Sync + 'static,
{
    /// Creates a domain with an empty session cache sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` yields an invalid cache
    /// configuration.
    pub fn new(
        validator: Arc<dyn SecretValidator<I, T>>,
        config: &RealmManagerConfig,
    ) -> Result<Self, ConfigError> {
        let domain = Self {
            validator,
            cache: Arc::new(HybridCache::new(config.cache_config()?)),
            storage: None,
            locks: SessionLocks::new(),
            session_lifetime: config.session_lifetime(),
            extension_time: config.extension_time(),
        };
        if tokio::runtime::Handle::try_current().is_ok() {
            domain.start_sweeper();
        } else {
            tracing::debug!(domain = I::DOMAIN, "no tokio runtime, session sweeper not started");
        }
        Ok(domain)
    }

    /// Attaches durable session storage.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn AuthenticationStorage<I, T>>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Authenticates `id` in `realm_id` and records a session bound to
    /// `client_address`, replacing any previous session of that identity.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthenticationFailed`] if the secret does not validate or the identity is
    ///   unknown
    /// - [`AuthError::StorageUnavailable`] if the credential lookup or durable session write fails
    /// - [`AuthError::SessionCapacityExhausted`] if the session cache cannot admit the session
    #[tracing::instrument(skip(self, secret), fields(domain = I::DOMAIN))]
    pub async fn authenticate(
        &self,
        realm_id: RealmId,
        id: I,
        secret: &[u8],
        client_address: IpAddr,
    ) -> Result<T, AuthError> {
        let resource = audit_resource::<I>(realm_id, &id);

        let token = match self.validator.authenticate(realm_id, &id, secret).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::info!(
                    audit.action = "authenticate",
                    audit.resource = %resource,
                    audit.result = "denied",
                    "audit_event"
                );
                return Err(AuthError::AuthenticationFailed);
            },
            Err(err) => {
                tracing::warn!(
                    audit.action = "authenticate",
                    audit.resource = %resource,
                    audit.result = "error",
                    error = %err,
                    "audit_event"
                );
                return Err(AuthError::StorageUnavailable(err));
            },
        };

        let expires_at = Utc::now()
            .checked_add_signed(to_chrono(self.session_lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let auth = RealmAuthentication::builder()
            .realm_id(realm_id)
            .id(id.clone())
            .token(token.clone())
            .client_address(client_address)
            .expires_at(expires_at)
            .extension_time(self.extension_time)
            .build();

        let _guard = self.locks.lock(&(realm_id, &id)).await;
        if let Some(storage) = &self.storage {
            storage.store(&auth).await.map_err(AuthError::StorageUnavailable)?;
        }

        if let Err(err) = self.cache.put((realm_id, id.clone()), auth, self.session_lifetime) {
            tracing::warn!(
                audit.action = "authenticate",
                audit.resource = %resource,
                audit.result = "capacity_exhausted",
                "audit_event"
            );
            if let Some(storage) = &self.storage
                && let Err(cleanup) = storage.remove(realm_id, &id).await
            {
                tracing::warn!(
                    error = %cleanup,
                    "failed to remove durable session after rejection"
                );
            }
            return Err(AuthError::SessionCapacityExhausted(err));
        }

        tracing::info!(
            audit.action = "authenticate",
            audit.resource = %resource,
            audit.result = "success",
            audit.expires_at = %expires_at,
            "audit_event"
        );
        Ok(token)
    }

    /// Checks whether `token` presented from `client_address` is a live
    /// session of `id` in `realm_id`. Never errors.
    ///
    /// A cached session that has expired, or whose token is presented from
    /// another address, is invalidated; a relocated token is also deleted
    /// from durable storage. A token that does not belong to the session is
    /// refused and the session is left alone. On a cache miss, durable
    /// storage (if attached) is consulted and a live matching session is
    /// re-admitted to the cache.
    #[tracing::instrument(skip(self, token), fields(domain = I::DOMAIN))]
    pub async fn is_authenticated(
        &self,
        realm_id: RealmId,
        id: &I,
        token: &T,
        client_address: IpAddr,
    ) -> bool {
        let key = (realm_id, id.clone());

        if let Some(session) = self.cache.get(&key) {
            return match Verdict::of(&session, token, &client_address) {
                Verdict::Valid => true,
                Verdict::Foreign => {
                    self.audit_refused(&session);
                    false
                },
                verdict => {
                    let _guard = self.locks.lock(&(realm_id, id)).await;
                    self.invalidate(&session, verdict).await;
                    false
                },
            };
        }

        let _guard = self.locks.lock(&(realm_id, id)).await;
        let Some(session) = self.recover(realm_id, id).await else {
            return false;
        };
        match Verdict::of(&session, token, &client_address) {
            Verdict::Valid => {},
            Verdict::Foreign => {
                self.audit_refused(&session);
                return false;
            },
            verdict => {
                self.invalidate(&session, verdict).await;
                return false;
            },
        }
        let ttl = session.remaining();
        if let Err(err) = self.cache.put(key, session, ttl) {
            tracing::debug!(error = %err, "recovered session not re-admitted to cache");
        } else {
            tracing::debug!("session recovered from durable storage");
        }
        true
    }

    /// Extends a live session by its extension window.
    ///
    /// Returns `Ok(false)` if there is no live session matching `token`
    /// and `client_address`. Invalidation follows the same rules as
    /// [`is_authenticated`](Self::is_authenticated): an expired session or
    /// a token presented from another address is invalidated, a foreign
    /// token leaves the session alone.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StorageUnavailable`] if the durable session write fails
    /// - [`AuthError::SessionCapacityExhausted`] if a session recovered from durable storage
    ///   cannot be admitted to the cache
    #[tracing::instrument(skip(self, token), fields(domain = I::DOMAIN))]
    pub async fn renew(
        &self,
        realm_id: RealmId,
        id: &I,
        token: &T,
        client_address: IpAddr,
    ) -> Result<bool, AuthError> {
        let key = (realm_id, id.clone());
        let _guard = self.locks.lock(&(realm_id, id)).await;

        let current = match self.cache.get(&key) {
            Some(session) => Some(session),
            None => self.recover(realm_id, id).await,
        };
        let Some(session) = current else {
            return Ok(false);
        };
        match Verdict::of(&session, token, &client_address) {
            Verdict::Valid => {},
            Verdict::Foreign => {
                self.audit_refused(&session);
                return Ok(false);
            },
            verdict => {
                self.invalidate(&session, verdict).await;
                return Ok(false);
            },
        }

        let renewed = session.extend_authentication();
        let expires_at = renewed.expires_at();
        let ttl = renewed.remaining();
        if let Some(storage) = &self.storage {
            storage.store(&renewed).await.map_err(AuthError::StorageUnavailable)?;
        }
        self.cache.put(key, renewed, ttl).map_err(AuthError::SessionCapacityExhausted)?;

        tracing::info!(
            audit.action = "renew",
            audit.resource = %audit_resource::<I>(realm_id, id),
            audit.result = "success",
            audit.expires_at = %expires_at,
            "audit_event"
        );
        Ok(true)
    }

    /// Revokes the session of `id` in `realm_id`. Revoking a missing session
    /// succeeds.
    ///
    /// Waits for any renewal or recovery of the same session already in
    /// flight, so the revocation is final.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StorageUnavailable`] if the durable copy cannot
    /// be deleted. The cached session is removed regardless.
    #[tracing::instrument(skip(self), fields(domain = I::DOMAIN))]
    pub async fn remove_from_realm(&self, realm_id: RealmId, id: &I) -> Result<(), AuthError> {
        let _guard = self.locks.lock(&(realm_id, id)).await;
        let cached = self.cache.remove(&(realm_id, id.clone())).is_some();
        if let Some(storage) = &self.storage {
            storage.remove(realm_id, id).await.map_err(AuthError::StorageUnavailable)?;
        }
        tracing::info!(
            audit.action = "revoke",
            audit.resource = %audit_resource::<I>(realm_id, id),
            audit.result = if cached { "success" } else { "not_found" },
            "audit_event"
        );
        Ok(())
    }

    /// The cached session of `id` in `realm_id`, if live.
    pub fn session(&self, realm_id: RealmId, id: &I) -> Option<RealmAuthentication<I, T>> {
        self.cache.get(&(realm_id, id.clone()))
    }

    /// Number of live cached sessions.
    pub fn active_sessions(&self) -> usize {
        self.cache.len()
    }

    /// Session cache counters.
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Starts the expired-session sweeper. No effect if already running.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime context.
    pub fn start_sweeper(&self) {
        self.cache.start_sweeper();
    }

    /// Stops the expired-session sweeper.
    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
    }

    async fn recover(&self, realm_id: RealmId, id: &I) -> Option<RealmAuthentication<I, T>> {
        let storage = self.storage.as_ref()?;
        match storage.retrieve(realm_id, id).await {
            Ok(Some(session))
                if session.realm_id() == realm_id
                    && session.id() == id
                    && !session.is_expired() =>
            {
                Some(session)
            },
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "durable session lookup failed");
                None
            },
        }
    }

    /// Drops `session` after a failed check. Callers hold the key's lock.
    ///
    /// Only the checked session is removed: a session that replaced it in
    /// the meantime carries another token and stays. A relocated token is
    /// deleted from durable storage too, so it cannot be recovered.
    async fn invalidate(&self, session: &RealmAuthentication<I, T>, verdict: Verdict) {
        let (realm_id, id) = (session.realm_id(), session.id());
        let stale = session.token();
        let key = (realm_id, id.clone());
        self.cache.remove_if(&key, |current| bool::from(current.token().ct_eq(stale)));

        if verdict == Verdict::Relocated
            && let Some(storage) = &self.storage
        {
            match storage.retrieve(realm_id, id).await {
                Ok(Some(durable)) if bool::from(durable.token().ct_eq(stale)) => {
                    if let Err(err) = storage.remove(realm_id, id).await {
                        tracing::warn!(error = %err, "failed to delete relocated session");
                    }
                },
                Ok(_) => {},
                Err(err) => {
                    tracing::warn!(error = %err, "durable session lookup failed");
                },
            }
        }

        tracing::warn!(
            audit.action = "invalidate",
            audit.resource = %audit_resource::<I>(realm_id, id),
            audit.result = if verdict == Verdict::Expired { "expired" } else { "address_mismatch" },
            "audit_event"
        );
    }

    fn audit_refused(&self, session: &RealmAuthentication<I, T>) {
        tracing::info!(
            audit.action = "verify",
            audit.resource = %audit_resource::<I>(session.realm_id(), session.id()),
            audit.result = "denied",
            "audit_event"
        );
    }
}

impl<I: Identity, T> std::fmt::Debug for RealmDomain<I, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmDomain")
            .field("domain", &I::DOMAIN)
            .field("cache", &self.cache)
            .field("durable", &self.storage.is_some())
            .field("session_lifetime", &self.session_lifetime)
            .finish_non_exhaustive()
    }
}

/// Peer and user session management for all realms.
///
/// # Example
///
/// ```no_run
/// use std::{net::{IpAddr, Ipv4Addr}, sync::Arc};
/// use realmkeep_authn::{RealmManager, RealmManagerConfig};
/// use realmkeep_storage::{
///     RealmId, UserId,
///     auth::{Credential, EncryptedSecret, MemoryCredentialStore},
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let users = Arc::new(MemoryCredentialStore::new());
/// users.insert(
///     Credential::builder()
///         .realm_id(RealmId(1))
///         .identity(UserId::new("alice"))
///         .secret(EncryptedSecret::hash_argon2id(b"hunter2")?)
///         .build(),
/// )?;
/// let peers = Arc::new(MemoryCredentialStore::new());
/// let manager = RealmManager::from_stores(peers, users, &RealmManagerConfig::default())?;
///
/// let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// let alice = UserId::new("alice");
/// let token = manager.authenticate_user(RealmId(1), alice.clone(), b"hunter2", addr).await?;
/// assert!(manager.is_user_authenticated(RealmId(1), &alice, &token, addr).await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RealmManager<T> {
    peers: RealmDomain<PeerId, T>,
    users: RealmDomain<UserId, T>,
}

impl<T> RealmManager<T>
where
    T: Clone + ConstantTimeEq + Send + Sync + 'static,
{
    /// Creates a manager from one validator per domain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` yields an invalid cache
    /// configuration.
    pub fn new(
        peer_validator: Arc<dyn SecretValidator<PeerId, T>>,
        user_validator: Arc<dyn SecretValidator<UserId, T>>,
        config: &RealmManagerConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            peers: RealmDomain::new(peer_validator, config)?,
            users: RealmDomain::new(user_validator, config)?,
        })
    }

    /// Attaches durable storage for peer sessions.
    #[must_use]
    pub fn with_peer_storage(
        mut self,
        storage: Arc<dyn AuthenticationStorage<PeerId, T>>,
    ) -> Self {
        self.peers = self.peers.with_storage(storage);
        self
    }

    /// Attaches durable storage for user sessions.
    #[must_use]
    pub fn with_user_storage(
        mut self,
        storage: Arc<dyn AuthenticationStorage<UserId, T>>,
    ) -> Self {
        self.users = self.users.with_storage(storage);
        self
    }

    /// The peer domain.
    pub fn peers(&self) -> &RealmDomain<PeerId, T> {
        &self.peers
    }

    /// The user domain.
    pub fn users(&self) -> &RealmDomain<UserId, T> {
        &self.users
    }

    /// See [`RealmDomain::authenticate`].
    ///
    /// # Errors
    ///
    /// As [`RealmDomain::authenticate`].
    pub async fn authenticate_peer(
        &self,
        realm_id: RealmId,
        id: PeerId,
        secret: &[u8],
        client_address: IpAddr,
    ) -> Result<T, AuthError> {
        self.peers.authenticate(realm_id, id, secret, client_address).await
    }

    /// See [`RealmDomain::authenticate`].
    ///
    /// # Errors
    ///
    /// As [`RealmDomain::authenticate`].
    pub async fn authenticate_user(
        &self,
        realm_id: RealmId,
        id: UserId,
        secret: &[u8],
        client_address: IpAddr,
    ) -> Result<T, AuthError> {
        self.users.authenticate(realm_id, id, secret, client_address).await
    }

    /// See [`RealmDomain::is_authenticated`].
    pub async fn is_peer_authenticated(
        &self,
        realm_id: RealmId,
        id: &PeerId,
        token: &T,
        client_address: IpAddr,
    ) -> bool {
        self.peers.is_authenticated(realm_id, id, token, client_address).await
    }

    /// See [`RealmDomain::is_authenticated`].
    pub async fn is_user_authenticated(
        &self,
        realm_id: RealmId,
        id: &UserId,
        token: &T,
        client_address: IpAddr,
    ) -> bool {
        self.users.is_authenticated(realm_id, id, token, client_address).await
    }

    /// See [`RealmDomain::renew`].
    ///
    /// # Errors
    ///
    /// As [`RealmDomain::renew`].
    pub async fn renew_peer(
        &self,
        realm_id: RealmId,
        id: &PeerId,
        token: &T,
        client_address: IpAddr,
    ) -> Result<bool, AuthError> {
        self.peers.renew(realm_id, id, token, client_address).await
    }

    /// See [`RealmDomain::renew`].
    ///
    /// # Errors
    ///
    /// As [`RealmDomain::renew`].
    pub async fn renew_user(
        &self,
        realm_id: RealmId,
        id: &UserId,
        token: &T,
        client_address: IpAddr,
    ) -> Result<bool, AuthError> {
        self.users.renew(realm_id, id, token, client_address).await
    }

    /// See [`RealmDomain::remove_from_realm`].
    ///
    /// # Errors
    ///
    /// As [`RealmDomain::remove_from_realm`].
    pub async fn remove_peer_from_realm(
        &self,
        realm_id: RealmId,
        id: &PeerId,
    ) -> Result<(), AuthError> {
        self.peers.remove_from_realm(realm_id, id).await
    }

    /// See [`RealmDomain::remove_from_realm`].
    ///
    /// # Errors
    ///
    /// As [`RealmDomain::remove_from_realm`].
    pub async fn remove_user_from_realm(
        &self,
        realm_id: RealmId,
        id: &UserId,
    ) -> Result<(), AuthError> {
        self.users.remove_from_realm(realm_id, id).await
    }

    /// Stops both session sweepers.
    pub async fn shutdown(&self) {
        self.peers.shutdown().await;
        self.users.shutdown().await;
    }
}

impl RealmManager<AuthToken> {
    /// Creates a manager that validates against the given credential stores
    /// and issues random [`AuthToken`]s.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` yields an invalid cache
    /// configuration.
    pub fn from_stores(
        peer_store: Arc<dyn CredentialStore<PeerId>>,
        user_store: Arc<dyn CredentialStore<UserId>>,
        config: &RealmManagerConfig,
    ) -> Result<Self, ConfigError> {
        Self::new(
            Arc::new(CredentialValidator::with_random_tokens(peer_store)),
            Arc::new(CredentialValidator::with_random_tokens(user_store)),
            config,
        )
    }
}

fn audit_resource<I: Identity>(realm_id: RealmId, id: &I) -> String {
    format!("realm:{realm_id}/{}:{id}", I::DOMAIN)
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
