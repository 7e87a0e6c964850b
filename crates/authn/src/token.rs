//! Token minting.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use realmkeep_storage::auth::{AuthToken, EncryptedSecret};

/// Number of random bytes in a generated token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Mints the token handed out after a secret validates.
///
/// The generator receives the stored secret of the identity that just
/// authenticated. Implementations must not derive the token from it in
/// any way an observer could reverse.
///
/// Closures `Fn(&EncryptedSecret) -> T` implement this trait, which is
/// convenient for deterministic tokens in tests.
pub trait TokenGenerator<T>: Send + Sync {
    /// Produces a fresh token.
    fn generate(&self, secret: &EncryptedSecret) -> T;
}

impl<T, F> TokenGenerator<T> for F
where
    F: Fn(&EncryptedSecret) -> T + Send + Sync,
{
    fn generate(&self, secret: &EncryptedSecret) -> T {
        self(secret)
    }
}

/// Default generator: 256 bits from the thread-local CSPRNG, base64url
/// encoded without padding. Ignores the secret entirely.
///
/// ```
/// use realmkeep_authn::token::{RandomTokenGenerator, TokenGenerator};
/// use realmkeep_storage::auth::EncryptedSecret;
///
/// let secret = EncryptedSecret::hash_sha256(b"pw");
/// let a = RandomTokenGenerator.generate(&secret);
/// let b = RandomTokenGenerator.generate(&secret);
/// assert_ne!(a, b);
/// assert_eq!(a.expose().len(), 43);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator<AuthToken> for RandomTokenGenerator {
    fn generate(&self, _secret: &EncryptedSecret) -> AuthToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        AuthToken::new(URL_SAFE_NO_PAD.encode(bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_random_tokens_are_unique_and_url_safe() {
        let secret = EncryptedSecret::hash_sha256(b"pw");
        let tokens: HashSet<String> = (0..1_000)
            .map(|_| RandomTokenGenerator.generate(&secret).expose().to_owned())
            .collect();
        assert_eq!(tokens.len(), 1_000);
        for token in &tokens {
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert_eq!(URL_SAFE_NO_PAD.decode(token).unwrap().len(), TOKEN_BYTES);
        }
    }

    #[test]
    fn test_token_does_not_embed_secret() {
        let secret = EncryptedSecret::hash_sha256(b"pw");
        let token = RandomTokenGenerator.generate(&secret);
        assert!(!secret.as_str().contains(token.expose()));
        assert!(!token.expose().contains("pw"));
    }

    #[test]
    fn test_closure_generator() {
        let fixed = |_: &EncryptedSecret| 7u64;
        assert_eq!(fixed.generate(&EncryptedSecret::hash_sha256(b"x")), 7);
    }
}
