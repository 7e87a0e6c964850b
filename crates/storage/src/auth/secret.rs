//! Stored secret representation and the constant-time match primitive.
//!
//! An [`EncryptedSecret`] is never decrypted. It is a one-way encoding of
//! the secret in a self-describing string of the form
//! `$<scheme>$<scheme-specific fields>`, and the only question it answers is
//! [`is_match`](EncryptedSecret::is_match).
//!
//! # Schemes
//!
//! | Wire tag | Format | Comparison |
//! |----------|--------|------------|
//! | `argon2id` | PHC string (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`) | `argon2` verifier |
//! | `sha256` | `$sha256$<salt b64>$<digest b64>` | `subtle::ConstantTimeEq` |
//!
//! Tags are resolved through a fixed table ([`SecretScheme::from_wire`]);
//! an unknown tag is a decoding error, not a silent fallback.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{StorageError, StorageResult};

/// Salt length for the `sha256` scheme, in bytes.
const SHA256_SALT_LEN: usize = 16;

/// Hashing scheme of an [`EncryptedSecret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretScheme {
    /// Argon2id password hash in PHC format.
    Argon2id,
    /// Salted SHA-256, for high-entropy machine secrets where a slow hash
    /// buys nothing.
    Sha256,
}

/// Wire tag → scheme. The single place new schemes are registered.
const SCHEME_REGISTRY: &[(&str, SecretScheme)] =
    &[("argon2id", SecretScheme::Argon2id), ("sha256", SecretScheme::Sha256)];

impl SecretScheme {
    /// Resolves a wire tag (the first `$`-delimited field) to a scheme.
    ///
    /// ```
    /// use realmkeep_storage::auth::SecretScheme;
    ///
    /// assert_eq!(SecretScheme::from_wire("argon2id"), Some(SecretScheme::Argon2id));
    /// assert_eq!(SecretScheme::from_wire("md5"), None);
    /// ```
    #[must_use]
    pub fn from_wire(tag: &str) -> Option<Self> {
        SCHEME_REGISTRY.iter().find(|(wire, _)| *wire == tag).map(|(_, scheme)| *scheme)
    }

    /// The wire tag of this scheme.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        SCHEME_REGISTRY
            .iter()
            .find(|(_, scheme)| *scheme == self)
            .map(|(wire, _)| *wire)
            .unwrap_or("unknown")
    }
}

impl std::fmt::Display for SecretScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A stored, non-reversible representation of a secret.
///
/// Construct one by hashing a plaintext ([`hash_argon2id`](Self::hash_argon2id),
/// [`hash_sha256`](Self::hash_sha256)) or by decoding a stored string
/// ([`parse`](Self::parse)). The encoded form is zeroized on drop and
/// redacted from `Debug` output.
///
/// # Example
///
/// ```
/// use realmkeep_storage::auth::EncryptedSecret;
///
/// let stored = EncryptedSecret::hash_sha256(b"s3cret");
/// assert!(stored.is_match(b"s3cret"));
/// assert!(!stored.is_match(b"guess"));
///
/// let reloaded = EncryptedSecret::parse(stored.as_str())?;
/// assert!(reloaded.is_match(b"s3cret"));
/// # Ok::<(), realmkeep_storage::StorageError>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncryptedSecret {
    scheme: SecretScheme,
    encoded: Zeroizing<String>,
}

impl EncryptedSecret {
    /// Decodes a stored secret string, validating its structure.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the string has no scheme
    /// tag, names an unregistered scheme, or is malformed for its scheme.
    pub fn parse(encoded: impl Into<String>) -> StorageResult<Self> {
        let encoded = Zeroizing::new(encoded.into());
        let tag = encoded
            .strip_prefix('$')
            .and_then(|rest| rest.split('$').next())
            .ok_or_else(|| StorageError::serialization("encrypted secret has no scheme tag"))?;
        let scheme = SecretScheme::from_wire(tag).ok_or_else(|| {
            StorageError::serialization(format!("unsupported secret scheme: {tag}"))
        })?;

        match scheme {
            SecretScheme::Argon2id => {
                PasswordHash::new(&encoded).map_err(|err| {
                    StorageError::serialization(format!("malformed argon2id hash: {err}"))
                })?;
            },
            SecretScheme::Sha256 => {
                split_sha256(&encoded)?;
            },
        }

        Ok(Self { scheme, encoded })
    }

    /// Hashes `secret` with Argon2id default parameters and a random salt.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if hashing fails.
    pub fn hash_argon2id(secret: &[u8]) -> StorageResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret, &salt)
            .map_err(|err| StorageError::internal(format!("argon2id hashing failed: {err}")))?;
        Ok(Self { scheme: SecretScheme::Argon2id, encoded: Zeroizing::new(hash.to_string()) })
    }

    /// Hashes `secret` as salted SHA-256 with a random 16-byte salt.
    #[must_use]
    pub fn hash_sha256(secret: &[u8]) -> Self {
        let mut salt = [0u8; SHA256_SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let digest = sha256_digest(&salt, secret);
        let encoded = format!(
            "$sha256${}${}",
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        );
        Self { scheme: SecretScheme::Sha256, encoded: Zeroizing::new(encoded) }
    }

    /// Tests a presented secret against this stored secret.
    ///
    /// The comparison runs in time independent of where the inputs differ.
    pub fn is_match(&self, presented: &[u8]) -> bool {
        match self.scheme {
            SecretScheme::Argon2id => match PasswordHash::new(&self.encoded) {
                Ok(hash) => Argon2::default().verify_password(presented, &hash).is_ok(),
                Err(err) => {
                    tracing::warn!(error = %err, "stored argon2id hash failed to decode");
                    false
                },
            },
            SecretScheme::Sha256 => match split_sha256(&self.encoded) {
                Ok((salt, expected)) => {
                    let actual = sha256_digest(&salt, presented);
                    bool::from(actual.as_slice().ct_eq(expected.as_slice()))
                },
                Err(err) => {
                    tracing::warn!(error = %err, "stored sha256 secret failed to decode");
                    false
                },
            },
        }
    }

    /// The scheme this secret was hashed with.
    #[must_use]
    pub fn scheme(&self) -> SecretScheme {
        self.scheme
    }

    /// The encoded form, suitable for persisting.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

fn sha256_digest(salt: &[u8], secret: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret);
    Zeroizing::new(hasher.finalize().to_vec())
}

/// Splits `$sha256$<salt>$<digest>` into decoded salt and digest.
fn split_sha256(encoded: &str) -> StorageResult<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    let mut fields = encoded.strip_prefix("$sha256$").unwrap_or_default().split('$');
    let (Some(salt), Some(digest), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(StorageError::serialization("sha256 secret must be $sha256$<salt>$<digest>"));
    };
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|err| StorageError::serialization_with_source("invalid sha256 salt", err))?;
    let digest = STANDARD_NO_PAD
        .decode(digest)
        .map_err(|err| StorageError::serialization_with_source("invalid sha256 digest", err))?;
    if digest.len() != 32 {
        return Err(StorageError::serialization("sha256 digest must be 32 bytes"));
    }
    Ok((salt, Zeroizing::new(digest)))
}

impl TryFrom<String> for EncryptedSecret {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EncryptedSecret> for String {
    fn from(secret: EncryptedSecret) -> Self {
        secret.encoded.as_str().to_owned()
    }
}

impl std::fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedSecret")
            .field("scheme", &self.scheme)
            .field("encoded", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_round_trips_every_scheme() {
        for (wire, scheme) in SCHEME_REGISTRY {
            assert_eq!(SecretScheme::from_wire(wire), Some(*scheme));
            assert_eq!(scheme.as_wire(), *wire);
        }
        assert_eq!(SecretScheme::from_wire("ARGON2ID"), None);
    }

    #[test]
    fn test_argon2id_match_and_mismatch() {
        let secret = EncryptedSecret::hash_argon2id(b"correct horse").unwrap();
        assert_eq!(secret.scheme(), SecretScheme::Argon2id);
        assert!(secret.as_str().starts_with("$argon2id$"));
        assert!(secret.is_match(b"correct horse"));
        assert!(!secret.is_match(b"correct horse "));
        assert!(!secret.is_match(b""));
    }

    #[test]
    fn test_sha256_match_and_mismatch() {
        let secret = EncryptedSecret::hash_sha256(b"machine-secret");
        assert!(secret.is_match(b"machine-secret"));
        assert!(!secret.is_match(b"machine-secreT"));
    }

    #[test]
    fn test_same_plaintext_gets_distinct_salts() {
        let a = EncryptedSecret::hash_sha256(b"same");
        let b = EncryptedSecret::hash_sha256(b"same");
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_parse_round_trip() {
        let argon = EncryptedSecret::hash_argon2id(b"pw").unwrap();
        let reparsed = EncryptedSecret::parse(argon.as_str()).unwrap();
        assert!(reparsed.is_match(b"pw"));

        let sha = EncryptedSecret::hash_sha256(b"pw");
        let reparsed = EncryptedSecret::parse(sha.as_str()).unwrap();
        assert!(reparsed.is_match(b"pw"));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in [
            "",
            "plaintext",
            "$md5$abc",
            "$argon2id$garbage",
            "$sha256$onlysalt",
            "$sha256$!!$!!",
            "$sha256$c2FsdA$c2hvcnQ",
            "$sha256$a$b$c",
        ] {
            let err = EncryptedSecret::parse(bad).unwrap_err();
            assert!(matches!(err, StorageError::Serialization { .. }), "{bad:?} -> {err}");
        }
    }

    #[test]
    fn test_serde_uses_encoded_string() {
        let secret = EncryptedSecret::hash_sha256(b"pw");
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, format!("\"{}\"", secret.as_str()));
        let back: EncryptedSecret = serde_json::from_str(&json).unwrap();
        assert!(back.is_match(b"pw"));
        assert!(serde_json::from_str::<EncryptedSecret>("\"$nope$x\"").is_err());
    }

    #[test]
    fn test_debug_redacts_encoded_form() {
        let secret = EncryptedSecret::hash_sha256(b"pw");
        let debug = format!("{secret:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(secret.as_str()));
    }
}
