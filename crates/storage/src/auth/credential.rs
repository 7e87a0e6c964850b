//! Stored credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{auth::EncryptedSecret, types::RealmId};

/// The secret an identity authenticates with inside one realm.
///
/// A credential with `active == false` is kept for audit but never
/// validates; callers treat it exactly like a missing credential.
///
/// # Examples
///
/// ```
/// use realmkeep_storage::{RealmId, UserId, auth::{Credential, EncryptedSecret}};
///
/// let credential = Credential::builder()
///     .realm_id(RealmId(7))
///     .identity(UserId::new("alice"))
///     .secret(EncryptedSecret::hash_sha256(b"hunter2"))
///     .build();
///
/// assert!(credential.active);
/// assert!(credential.secret.is_match(b"hunter2"));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Credential<I> {
    /// Realm the credential belongs to.
    pub realm_id: RealmId,
    /// Identity the credential authenticates.
    pub identity: I,
    /// One-way encoding of the secret.
    pub secret: EncryptedSecret,
    /// Whether the credential may be used.
    #[builder(default = true)]
    #[serde(default = "default_active")]
    pub active: bool,
    /// When the credential was created.
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl<I> Credential<I> {
    /// Whether `presented` matches and the credential is active.
    #[must_use]
    pub fn verifies(&self, presented: &[u8]) -> bool {
        // Hash even for inactive credentials so timing does not reveal the flag.
        let matched = self.secret.is_match(presented);
        matched && self.active
    }
}
