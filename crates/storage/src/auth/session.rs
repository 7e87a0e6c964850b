//! The record of one successful authentication.

use std::{net::IpAddr, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::types::RealmId;

/// Default sliding-window length applied on each renewal (30 minutes).
pub const DEFAULT_EXTENSION_TIME: Duration = Duration::from_secs(1_800);

/// A live authentication of identity `I` in one realm, bound to the token
/// `T` issued for it and the address it was issued to.
///
/// Records are immutable; [`extend_authentication`](Self::extend_authentication)
/// returns a new record with a later deadline.
///
/// # Examples
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
/// use chrono::{Duration, Utc};
/// use realmkeep_storage::{RealmId, UserId, auth::{AuthToken, RealmAuthentication}};
///
/// let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// let auth = RealmAuthentication::builder()
///     .realm_id(RealmId(1))
///     .id(UserId::new("alice"))
///     .token(AuthToken::new("t0k"))
///     .client_address(addr)
///     .expires_at(Utc::now() + Duration::minutes(30))
///     .build();
///
/// assert!(auth.is_authenticated(&AuthToken::new("t0k"), &addr));
/// assert!(!auth.is_authenticated(&AuthToken::new("nope"), &addr));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct RealmAuthentication<I, T> {
    realm_id: RealmId,
    id: I,
    token: T,
    client_address: IpAddr,
    expires_at: DateTime<Utc>,
    #[builder(default = DEFAULT_EXTENSION_TIME)]
    #[serde(with = "humantime_serde")]
    extension_time: Duration,
}

impl<I, T> RealmAuthentication<I, T> {
    /// Realm the authentication was granted in.
    #[must_use]
    pub fn realm_id(&self) -> RealmId {
        self.realm_id
    }

    /// Authenticated identity.
    #[must_use]
    pub fn id(&self) -> &I {
        &self.id
    }

    /// Token issued for this authentication.
    #[must_use]
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Address the token was issued to.
    #[must_use]
    pub fn client_address(&self) -> IpAddr {
        self.client_address
    }

    /// Absolute deadline.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Window added by each renewal.
    #[must_use]
    pub fn extension_time(&self) -> Duration {
        self.extension_time
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the deadline has passed as of `now`. A deadline equal to
    /// `now` counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

impl<I, T: ConstantTimeEq> RealmAuthentication<I, T> {
    /// Checks a presented token and address against this record.
    ///
    /// Both checks always run; the token comparison is constant-time.
    #[must_use]
    pub fn is_authenticated(&self, token: &T, client_address: &IpAddr) -> bool {
        let token_ok: bool = self.token.ct_eq(token).into();
        let address_ok = self.client_address == *client_address;
        token_ok & address_ok & !self.is_expired()
    }
}

impl<I: Clone, T: Clone> RealmAuthentication<I, T> {
    /// Returns a copy whose deadline is `max(expires_at, now + extension_time)`.
    ///
    /// The deadline never moves backwards, so renewing a record that was
    /// just issued with a long lifetime keeps that lifetime.
    #[must_use]
    pub fn extend_authentication(&self) -> Self {
        let extension = chrono::Duration::from_std(self.extension_time)
            .unwrap_or(chrono::Duration::MAX);
        let candidate =
            Utc::now().checked_add_signed(extension).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { expires_at: self.expires_at.max(candidate), ..self.clone() }
    }
}

impl<I: PartialEq, T: ConstantTimeEq> PartialEq for RealmAuthentication<I, T> {
    fn eq(&self, other: &Self) -> bool {
        self.realm_id == other.realm_id
            && self.id == other.id
            && bool::from(self.token.ct_eq(&other.token))
            && self.client_address == other.client_address
            && self.expires_at == other.expires_at
            && self.extension_time == other.extension_time
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::{auth::AuthToken, types::PeerId};

    const ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));

    fn auth_expiring_in(delta: chrono::Duration) -> RealmAuthentication<PeerId, AuthToken> {
        RealmAuthentication::builder()
            .realm_id(RealmId(42))
            .id(PeerId::new("node-a"))
            .token(AuthToken::new("token-a"))
            .client_address(ADDR)
            .expires_at(Utc::now() + delta)
            .build()
    }

    #[test]
    fn test_is_authenticated_requires_token_address_and_time() {
        let auth = auth_expiring_in(chrono::Duration::minutes(5));
        assert!(auth.is_authenticated(&AuthToken::new("token-a"), &ADDR));
        assert!(!auth.is_authenticated(&AuthToken::new("token-b"), &ADDR));
        let elsewhere = IpAddr::V6(Ipv6Addr::LOCALHOST);
        assert!(!auth.is_authenticated(&AuthToken::new("token-a"), &elsewhere));

        let expired = auth_expiring_in(chrono::Duration::seconds(-1));
        assert!(expired.is_expired());
        assert!(!expired.is_authenticated(&AuthToken::new("token-a"), &ADDR));
        assert_eq!(expired.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let auth = auth_expiring_in(chrono::Duration::minutes(1));
        assert!(auth.is_expired_at(auth.expires_at()));
        assert!(!auth.is_expired_at(auth.expires_at() - chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_extension_moves_short_deadline_forward() {
        let auth = auth_expiring_in(chrono::Duration::seconds(10));
        let extended = auth.extend_authentication();
        assert!(extended.expires_at() > auth.expires_at());
        assert!(extended.remaining() > Duration::from_secs(1_700));
        assert_eq!(extended.token(), auth.token());
        assert_eq!(extended.id(), auth.id());
    }

    #[test]
    fn test_extension_never_shortens() {
        let auth = auth_expiring_in(chrono::Duration::hours(4));
        let extended = auth.extend_authentication();
        assert_eq!(extended.expires_at(), auth.expires_at());
    }

    #[test]
    fn test_extension_revives_expired_record() {
        let auth = auth_expiring_in(chrono::Duration::seconds(-30));
        assert!(!auth.extend_authentication().is_expired());
    }

    #[test]
    fn test_serde_round_trip() {
        let auth = auth_expiring_in(chrono::Duration::minutes(30));
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["extension_time"], "30m");
        assert_eq!(json["token"], "token-a");
        let back: RealmAuthentication<PeerId, AuthToken> = serde_json::from_value(json).unwrap();
        assert_eq!(back, auth);
    }
}
