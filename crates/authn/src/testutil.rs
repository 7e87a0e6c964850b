//! Shared test utilities for authentication testing.
//!
//! Provides a [`TestRealm`] fixture that wires a [`RealmManager`] to
//! in-memory credential stores, plus deterministic token generation. It is
//! feature-gated behind `testutil` to prevent leaking into production
//! builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! realmkeep-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use realmkeep_authn::testutil::{TestRealm, client_address};
//! ```

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use realmkeep_storage::{
    PeerId, RealmId, UserId,
    auth::{AuthToken, EncryptedSecret, MemoryCredentialStore},
    testutil::make_credential,
};

use crate::{RealmManager, RealmManagerConfig};

/// Realm used by fixtures unless a test picks its own.
pub const TEST_REALM: RealmId = RealmId(1_000);

/// A client address in the documentation range, varied by `n`.
#[must_use]
pub fn client_address(n: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, n))
}

/// Token generator yielding `token-0`, `token-1`, … in order.
///
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct SequentialTokens {
    next: Arc<AtomicU64>,
}

impl SequentialTokens {
    /// Creates a generator starting at `token-0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens issued so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl crate::TokenGenerator<AuthToken> for SequentialTokens {
    fn generate(&self, _secret: &EncryptedSecret) -> AuthToken {
        AuthToken::new(format!("token-{}", self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

/// A [`RealmManager`] over in-memory credential stores.
pub struct TestRealm {
    /// The manager under test.
    pub manager: RealmManager<AuthToken>,
    /// Peer credentials.
    pub peers: Arc<MemoryCredentialStore<PeerId>>,
    /// User credentials.
    pub users: Arc<MemoryCredentialStore<UserId>>,
}

impl TestRealm {
    /// Builds a fixture with `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config` cannot produce a valid cache configuration.
    #[must_use]
    pub fn new(config: &RealmManagerConfig) -> Self {
        let peers = Arc::new(MemoryCredentialStore::new());
        let users = Arc::new(MemoryCredentialStore::new());
        let manager = RealmManager::from_stores(peers.clone(), users.clone(), config)
            .expect("valid realm manager config");
        Self { manager, peers, users }
    }

    /// Builds a fixture with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(&RealmManagerConfig::default())
    }

    /// Registers a user credential in [`TEST_REALM`].
    ///
    /// # Panics
    ///
    /// Panics if the user already has a credential there.
    pub fn add_user(&self, name: &str, secret: &str) -> UserId {
        let id = UserId::new(name);
        self.users.insert(make_credential(TEST_REALM, id.clone(), secret)).expect("new user");
        id
    }

    /// Registers a peer credential in [`TEST_REALM`].
    ///
    /// # Panics
    ///
    /// Panics if the peer already has a credential there.
    pub fn add_peer(&self, name: &str, secret: &str) -> PeerId {
        let id = PeerId::new(name);
        self.peers.insert(make_credential(TEST_REALM, id.clone(), secret)).expect("new peer");
        id
    }
}
