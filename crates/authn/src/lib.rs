//! # realmkeep Authentication
//!
//! Realm-scoped authentication for peers and users.
//!
//! This crate provides:
//! - **Secret validation**: presented secrets checked against stored credentials in constant time
//! - **Token minting**: 256-bit random session tokens
//! - **Realm manager**: authenticate / verify / renew / revoke, with sessions held in a bounded
//!   LRU + TTL cache and optionally mirrored to durable storage
//!
//! ## Features
//!
//! - Unknown identities and wrong secrets are indistinguishable to callers
//! - Sessions are bound to the client address they were issued to
//! - Storage outages surface as a distinct, retryable error
//!
//! ## Example
//!
//! ```no_run
//! use std::{net::{IpAddr, Ipv4Addr}, sync::Arc};
//! use realmkeep_authn::{RealmManager, RealmManagerConfig};
//! use realmkeep_storage::{PeerId, RealmId, auth::MemoryCredentialStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let peers = Arc::new(MemoryCredentialStore::new());
//! let users = Arc::new(MemoryCredentialStore::new());
//! let manager = RealmManager::from_stores(peers, users, &RealmManagerConfig::default())?;
//!
//! let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
//! let node = PeerId::new("node-7");
//! let token = manager.authenticate_peer(RealmId(1), node.clone(), b"secret", addr).await?;
//! assert!(manager.is_peer_authenticated(RealmId(1), &node, &token, addr).await);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Authentication error types.
pub mod error;
/// Realm session manager.
pub mod realm_manager;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub mod testutil;
/// Token generation.
pub mod token;
/// Secret validators.
pub mod validator;

// Re-export key types for convenience
pub use error::{AuthError, Result};
pub use realm_manager::{
    CACHE_TRIM_MARGIN, DEFAULT_EXPIRES, DEFAULT_MAX_CACHE_SIZE, RealmDomain, RealmManager,
    RealmManagerConfig,
};
pub use token::{RandomTokenGenerator, TokenGenerator};
pub use validator::{CredentialValidator, SecretValidator, TrustedValidator};
