//! Credential and authentication-record types and their stores.
//!
//! # Data flow
//!
//! ```text
//! ┌─────────────────┐  retrieve_credential_for  ┌─────────────────┐
//! │ CredentialStore │◄──────────────────────────│ SecretValidator │
//! └─────────────────┘                           └────────┬────────┘
//!                                                        │ RealmAuthentication
//!                                                        ▼
//! ┌───────────────────────┐  store / retrieve   ┌─────────────────┐
//! │ AuthenticationStorage │◄───────────────────►│   HybridCache   │
//! └───────────────────────┘                     └─────────────────┘
//! ```
//!
//! Secrets are stored as [`EncryptedSecret`] values and only ever compared,
//! never recovered. Issued sessions are [`RealmAuthentication`] records
//! bound to an [`AuthToken`] and a client address.
//!
//! # Examples
//!
//! ```no_run
//! use realmkeep_storage::{RealmId, UserId};
//! use realmkeep_storage::auth::{
//!     Credential, CredentialStore, EncryptedSecret, MemoryCredentialStore,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = MemoryCredentialStore::new();
//! store
//!     .insert(
//!         Credential::builder()
//!             .realm_id(RealmId(1))
//!             .identity(UserId::new("alice"))
//!             .secret(EncryptedSecret::hash_argon2id(b"hunter2").unwrap())
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let alice = UserId::new("alice");
//! let credential = store.retrieve_credential_for(RealmId(1), &alice).await.unwrap();
//! assert!(credential.unwrap().verifies(b"hunter2"));
//! # });
//! ```

mod credential;
mod secret;
mod session;
mod session_store;
mod store;
mod token;

pub use credential::Credential;
pub use secret::{EncryptedSecret, SecretScheme};
pub use session::{DEFAULT_EXTENSION_TIME, RealmAuthentication};
pub use session_store::{AuthenticationStorage, MemoryAuthenticationStorage};
pub use store::{CredentialStore, MemoryCredentialStore};
pub use token::AuthToken;
