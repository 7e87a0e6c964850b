//! Secret validation against stored credentials.
//!
//! A [`SecretValidator`] turns `(realm, identity, presented secret)` into an
//! optional token:
//!
//! ```text
//! retrieve_credential_for ──► None ─────────────────────────► Ok(None)
//!            │
//!            ▼
//!      verifies(secret) ─────► false ───────────────────────► Ok(None)
//!            │
//!            ▼ true
//!   TokenGenerator::generate ───────────────────────────────► Ok(Some(token))
//! ```
//!
//! Store errors are returned as `Err`, never folded into `Ok(None)`.
//!
//! A missing credential is still charged one secret comparison, against a
//! decoy, so response time does not reveal whether an identity exists.

use std::{
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use fail::fail_point;
use rand::RngCore;
use realmkeep_storage::{
    Identity, RealmId, StorageError, StorageResult,
    auth::{AuthToken, CredentialStore, EncryptedSecret},
};

use crate::token::{RandomTokenGenerator, TokenGenerator};

/// Argon2id hash of random bytes, compared against when no credential
/// exists.
static DEFAULT_DECOY: LazyLock<EncryptedSecret> = LazyLock::new(|| {
    let mut seed = [0u8; 32];
    rand::rng().fill_bytes(&mut seed);
    EncryptedSecret::hash_argon2id(&seed).unwrap_or_else(|err| {
        tracing::error!(error = %err, "argon2id decoy unavailable, falling back to sha256");
        EncryptedSecret::hash_sha256(&seed)
    })
});

/// Validates a presented secret and mints a token on success.
#[async_trait]
pub trait SecretValidator<I: Identity, T>: Send + Sync {
    /// Returns `Ok(Some(token))` if `secret` is valid for `id` in `realm_id`,
    /// `Ok(None)` if it is not (including when `id` is unknown).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`StorageError`] if the credential lookup
    /// fails or times out.
    async fn authenticate(
        &self,
        realm_id: RealmId,
        id: &I,
        secret: &[u8],
    ) -> StorageResult<Option<T>>;
}

/// Validator backed by a [`CredentialStore`].
///
/// # Example
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
/// use realmkeep_authn::validator::{CredentialValidator, SecretValidator};
/// use realmkeep_storage::{RealmId, UserId, auth::MemoryCredentialStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryCredentialStore::<UserId>::new());
/// let validator = CredentialValidator::with_random_tokens(store)
///     .with_lookup_timeout(Duration::from_millis(250));
///
/// let token = validator.authenticate(RealmId(1), &UserId::new("alice"), b"pw").await?;
/// assert!(token.is_none());
/// # Ok(())
/// # }
/// ```
pub struct CredentialValidator<I, T> {
    store: Arc<dyn CredentialStore<I>>,
    generator: Arc<dyn TokenGenerator<T>>,
    lookup_timeout: Option<Duration>,
    decoy: Option<EncryptedSecret>,
    verifications: AtomicU64,
}

impl<I: Identity, T> CredentialValidator<I, T> {
    /// Creates a validator that mints tokens with `generator`.
    pub fn new(
        store: Arc<dyn CredentialStore<I>>,
        generator: impl TokenGenerator<T> + 'static,
    ) -> Self {
        Self {
            store,
            generator: Arc::new(generator),
            lookup_timeout: None,
            decoy: None,
            verifications: AtomicU64::new(0),
        }
    }

    /// Bounds each credential lookup. A lookup that takes longer fails with
    /// [`StorageError::Timeout`].
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    /// The configured lookup bound, if any.
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout
    }

    /// Replaces the decoy compared against for unknown identities.
    ///
    /// The decoy should use the scheme and cost of the stored credentials.
    /// The default is an argon2id hash with default parameters.
    #[must_use]
    pub fn with_decoy_secret(mut self, decoy: EncryptedSecret) -> Self {
        self.decoy = Some(decoy);
        self
    }

    /// Number of secret comparisons run so far, decoys included.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }

    fn decoy(&self) -> &EncryptedSecret {
        self.decoy.as_ref().unwrap_or(&*DEFAULT_DECOY)
    }
}

impl<I: Identity> CredentialValidator<I, AuthToken> {
    /// Creates a validator that mints [`RandomTokenGenerator`] tokens.
    pub fn with_random_tokens(store: Arc<dyn CredentialStore<I>>) -> Self {
        Self::new(store, RandomTokenGenerator)
    }
}

#[async_trait]
impl<I, T> SecretValidator<I, T> for CredentialValidator<I, T>
where
    I: Identity,
    T: Send + 'static,
{
    #[tracing::instrument(skip(self, secret), fields(domain = I::DOMAIN))]
    async fn authenticate(
        &self,
        realm_id: RealmId,
        id: &I,
        secret: &[u8],
    ) -> StorageResult<Option<T>> {
        fail_point!("credential-before-lookup", |_| {
            Err(StorageError::internal("injected failure before credential lookup"))
        });

        let lookup = self.store.retrieve_credential_for(realm_id, id);
        let credential = match self.lookup_timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "credential lookup timed out"
                    );
                    return Err(StorageError::timeout());
                },
            },
            None => lookup.await?,
        };

        self.verifications.fetch_add(1, Ordering::Relaxed);
        let Some(credential) = credential else {
            std::hint::black_box(self.decoy().is_match(secret));
            tracing::debug!("no credential for identity");
            return Ok(None);
        };
        if !credential.verifies(secret) {
            tracing::debug!("secret did not verify");
            return Ok(None);
        }
        Ok(Some(self.generator.generate(&credential.secret)))
    }
}

impl<I, T> std::fmt::Debug for CredentialValidator<I, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("lookup_timeout", &self.lookup_timeout)
            .field("verifications", &self.verifications.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Validator that accepts every secret.
///
/// Only for trusted contexts where the caller has already been
/// authenticated by other means. It is never a default anywhere in this
/// crate and can only be built through [`trust_all`](Self::trust_all).
pub struct TrustedValidator<T> {
    generator: Arc<dyn TokenGenerator<T>>,
}

impl<T> TrustedValidator<T> {
    /// Creates a validator that accepts any secret for any identity.
    ///
    /// Logs a warning on construction.
    pub fn trust_all(generator: impl TokenGenerator<T> + 'static) -> Self {
        tracing::warn!("TrustedValidator constructed: every presented secret will be accepted");
        Self { generator: Arc::new(generator) }
    }
}

#[async_trait]
impl<I, T> SecretValidator<I, T> for TrustedValidator<T>
where
    I: Identity,
    T: Send + 'static,
{
    #[tracing::instrument(skip(self, secret), fields(domain = I::DOMAIN))]
    async fn authenticate(
        &self,
        realm_id: RealmId,
        id: &I,
        secret: &[u8],
    ) -> StorageResult<Option<T>> {
        tracing::debug!("trusted validation, secret not checked");
        // The generator always sees a stored-form secret, never plaintext.
        let presented = EncryptedSecret::hash_sha256(secret);
        Ok(Some(self.generator.generate(&presented)))
    }
}

impl<T> std::fmt::Debug for TrustedValidator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use realmkeep_storage::{
        UserId,
        auth::{MemoryCredentialStore, SecretScheme},
        testutil::{FailingCredentialStore, InjectedFailure, make_credential},
    };

    use super::*;

    const REALM: RealmId = RealmId(11);

    fn store_with_alice() -> Arc<MemoryCredentialStore<UserId>> {
        let store = MemoryCredentialStore::new();
        store.insert(make_credential(REALM, UserId::new("alice"), "hunter2")).unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_valid_secret_mints_token() {
        let validator = CredentialValidator::with_random_tokens(store_with_alice());
        let token = validator.authenticate(REALM, &UserId::new("alice"), b"hunter2").await.unwrap();
        assert!(token.is_some());
    }

    #[tokio::test]
    async fn test_wrong_secret_and_unknown_identity_look_the_same() {
        let validator = CredentialValidator::with_random_tokens(store_with_alice());
        let wrong = validator.authenticate(REALM, &UserId::new("alice"), b"nope").await.unwrap();
        let unknown = validator.authenticate(REALM, &UserId::new("mallory"), b"x").await.unwrap();
        let other_realm =
            validator.authenticate(RealmId(12), &UserId::new("alice"), b"hunter2").await.unwrap();
        assert!(wrong.is_none());
        assert!(unknown.is_none());
        assert!(other_realm.is_none());
    }

    #[tokio::test]
    async fn test_unknown_identity_costs_one_comparison() {
        let validator = CredentialValidator::with_random_tokens(store_with_alice())
            .with_decoy_secret(EncryptedSecret::hash_sha256(b"decoy"));

        validator.authenticate(REALM, &UserId::new("alice"), b"nope").await.unwrap();
        assert_eq!(validator.verifications(), 1);

        validator.authenticate(REALM, &UserId::new("mallory"), b"nope").await.unwrap();
        assert_eq!(validator.verifications(), 2);

        validator.authenticate(RealmId(12), &UserId::new("alice"), b"hunter2").await.unwrap();
        assert_eq!(validator.verifications(), 3);
    }

    #[test]
    fn test_default_decoy_is_argon2id_and_never_matches_empty() {
        let validator = CredentialValidator::with_random_tokens(store_with_alice());
        assert_eq!(validator.decoy().scheme(), SecretScheme::Argon2id);
        assert!(!validator.decoy().is_match(b""));
    }

    #[tokio::test]
    async fn test_inactive_credential_rejected() {
        let store = store_with_alice();
        store.set_active(REALM, &UserId::new("alice"), false);
        let validator = CredentialValidator::with_random_tokens(store);
        let token = validator.authenticate(REALM, &UserId::new("alice"), b"hunter2").await.unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn test_custom_generator_receives_stored_secret() {
        let validator = CredentialValidator::new(store_with_alice(), |secret: &EncryptedSecret| {
            secret.scheme().as_wire().to_owned()
        });
        let token = validator.authenticate(REALM, &UserId::new("alice"), b"hunter2").await.unwrap();
        assert_eq!(token.as_deref(), Some("sha256"));
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let store = Arc::new(FailingCredentialStore::new(
            MemoryCredentialStore::<UserId>::new(),
            InjectedFailure::Connection,
        ));
        let validator = CredentialValidator::with_random_tokens(store);
        let err = validator.authenticate(REALM, &UserId::new("alice"), b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::Connection { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_timeout_maps_to_timeout_error() {
        let inner = MemoryCredentialStore::new();
        inner.insert(make_credential(REALM, UserId::new("alice"), "hunter2")).unwrap();
        let store = Arc::new(FailingCredentialStore::new(
            inner,
            InjectedFailure::Delay(Duration::from_secs(5)),
        ));
        let validator = CredentialValidator::with_random_tokens(store.clone())
            .with_lookup_timeout(Duration::from_millis(100));

        let alice = UserId::new("alice");
        let err = validator.authenticate(REALM, &alice, b"hunter2").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout));

        store.set_failing(false);
        let token = validator.authenticate(REALM, &alice, b"hunter2").await.unwrap();
        assert!(token.is_some());
    }

    #[tokio::test]
    async fn test_trusted_validator_accepts_anything() {
        let validator = TrustedValidator::trust_all(RandomTokenGenerator);
        let token = SecretValidator::<UserId, AuthToken>::authenticate(
            &validator,
            REALM,
            &UserId::new("anyone"),
            b"",
        )
        .await
        .unwrap();
        assert!(token.is_some());
    }
}
