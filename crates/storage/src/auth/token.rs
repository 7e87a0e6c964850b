//! Opaque bearer token issued on successful authentication.

use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroizing;

/// Session token returned to a client after authenticating.
///
/// Equality is constant-time in the token contents. The value is zeroized
/// on drop and never printed by `Debug`.
///
/// ```
/// use realmkeep_storage::auth::AuthToken;
///
/// let token = AuthToken::new("abc");
/// assert_eq!(token, AuthToken::from("abc"));
/// assert_ne!(token, AuthToken::from("abd"));
/// assert_eq!(format!("{token:?}"), "AuthToken(<redacted>)");
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(Zeroizing<String>);

impl AuthToken {
    /// Wraps an already-generated token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// The token text, for handing back to the client.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl ConstantTimeEq for AuthToken {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.as_bytes().ct_eq(other.0.as_bytes())
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for AuthToken {}

impl From<String> for AuthToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AuthToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
