//! Identifier types shared by the cache, the stores and the realm manager.
//!
//! Realms are numeric (Snowflake-style `i64`), identities are opaque
//! strings. Each gets its own newtype so a `UserId` can never be passed
//! where a `PeerId` is expected.

/// Macro to define a newtype wrapper around `i64` with standard trait
/// implementations.
///
/// Each generated type:
/// - Is a transparent wrapper around `i64` (zero runtime cost)
/// - Derives `Copy`, `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From<i64>` and `Into<i64>`
/// - Implements `Display` that outputs the inner value
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Same as `define_id!`, for string-valued identities.
macro_rules! define_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from anything convertible to a `String`.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Realm ID: the namespace that scopes identities, credentials and
    /// sessions.
    ///
    /// # Examples
    ///
    /// ```
    /// use realmkeep_storage::RealmId;
    ///
    /// let realm = RealmId::from(42);
    /// assert_eq!(i64::from(realm), 42);
    /// assert_eq!(realm.to_string(), "42");
    /// ```
    RealmId
);

define_name!(
    /// Identity of a peer (another service or node) authenticating to a
    /// realm.
    ///
    /// # Examples
    ///
    /// ```
    /// use realmkeep_storage::PeerId;
    ///
    /// let peer = PeerId::from("node-7");
    /// assert_eq!(peer.as_str(), "node-7");
    /// ```
    PeerId
);

define_name!(
    /// Identity of a user authenticating to a realm.
    ///
    /// # Examples
    ///
    /// ```
    /// use realmkeep_storage::UserId;
    ///
    /// let user = UserId::new("alice");
    /// assert_eq!(user.to_string(), "alice");
    /// ```
    UserId
);

/// An identity that can be authenticated against a realm.
///
/// Implemented for [`PeerId`] and [`UserId`]; the bounds are what the cache
/// and the stores need from a key component.
pub trait Identity:
    Clone
    + std::fmt::Debug
    + std::fmt::Display
    + Eq
    + std::hash::Hash
    + Ord
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Short label of the identity domain, used in log fields.
    const DOMAIN: &'static str;
}

impl Identity for PeerId {
    const DOMAIN: &'static str = "peer";
}

impl Identity for UserId {
    const DOMAIN: &'static str = "user";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_id_ordering_follows_inner_value() {
        assert!(RealmId::from(1) < RealmId::from(2));
    }

    #[test]
    fn test_names_are_distinct_types_with_same_text() {
        let peer = PeerId::from("x");
        let user = UserId::from("x");
        assert_eq!(peer.as_str(), user.as_str());
        assert_eq!(<PeerId as Identity>::DOMAIN, "peer");
        assert_eq!(<UserId as Identity>::DOMAIN, "user");
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&UserId::new("bob")).unwrap_or_default();
        assert_eq!(json, "\"bob\"");
        let realm: RealmId = serde_json::from_str("7").unwrap_or(RealmId(0));
        assert_eq!(realm, RealmId(7));
    }
}
