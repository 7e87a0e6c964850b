//! Realm-scoped credential storage and the bounded session cache behind
//! realmkeep authentication.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 realmkeep-authn (RealmManager)              │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │            auth              │            cache             │
//! │  CredentialStore             │  HybridCache<K, V>           │
//! │  EncryptedSecret             │   TTL + LRU + min-live       │
//! │  RealmAuthentication         │   background sweeper         │
//! │  AuthenticationStorage       │                              │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │        types (RealmId, PeerId, UserId)   error              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use realmkeep_storage::cache::{HybridCache, HybridCacheConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HybridCacheConfig::builder().capacity(1_000).build()?;
//!     let cache: HybridCache<String, u64> = HybridCache::new(config);
//!
//!     cache.put("session-1".to_owned(), 7, Duration::from_secs(60))?;
//!     assert_eq!(cache.get(&"session-1".to_owned()), Some(7));
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Store operations return [`StorageResult<T>`]. Cache admission failures
//! are [`CacheError`] and configuration problems are [`ConfigError`]; the
//! three are kept apart so callers can tell "backend down" from "cache full"
//! from "bad settings".
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with failure-injecting stores, credential
//!   factories and assertion macros. Enable this in `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod auth;
pub mod cache;
pub mod error;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use cache::{HybridCache, HybridCacheConfig};
pub use error::{BoxError, CacheError, ConfigError, StorageError, StorageResult};
pub use types::{Identity, PeerId, RealmId, UserId};
pub use zeroize::Zeroizing;
