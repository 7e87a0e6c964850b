//! Expirable cache entry.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline used when `inserted_at + ttl` is not representable.
///
/// About a century; far enough that the entry never expires in practice.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// A value wrapper carrying its insertion time, last access and deadline.
///
/// Besides wall instants, every entry carries two logical ticks drawn from
/// the owning cache's monotonic counter. Recency ordering uses the ticks so
/// that two operations inside the same clock granule still order strictly.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    key: K,
    value: V,
    inserted_at: Instant,
    last_access: Instant,
    expires_at: Instant,
    inserted_tick: u64,
    access_tick: u64,
}

impl<K, V> CacheEntry<K, V> {
    /// Creates an entry inserted (and last accessed) at `now`.
    ///
    /// `expires_at` saturates to [`FAR_FUTURE`] past `now` when `now + ttl`
    /// overflows, so `expires_at >= inserted_at` always holds.
    pub(crate) fn new(key: K, value: V, now: Instant, tick: u64, ttl: Duration) -> Self {
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE);
        Self {
            key,
            value,
            inserted_at: now,
            last_access: now,
            expires_at,
            inserted_tick: tick,
            access_tick: tick,
        }
    }

    /// The entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The cached value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// When the entry was inserted (or last replaced).
    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    /// When the entry was last read or written.
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// The absolute deadline after which the entry is dead.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// An entry is expired once `now` reaches its deadline.
    ///
    /// A zero TTL therefore expires immediately.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Time left until the deadline, zero if already expired.
    pub fn time_to_live(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Age since insertion.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    pub(crate) fn touch(&mut self, now: Instant, tick: u64) {
        self.last_access = now;
        self.access_tick = tick;
    }

    pub(crate) fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K: Clone, V> CacheEntry<K, V> {
    pub(crate) fn recency_key(&self) -> RecencyKey<K> {
        RecencyKey {
            access_tick: self.access_tick,
            inserted_tick: self.inserted_tick,
            key: self.key.clone(),
        }
    }

    pub(crate) fn expiry_key(&self) -> ExpiryKey<K> {
        ExpiryKey { expires_at: self.expires_at, key: self.key.clone() }
    }
}

/// Position of an entry in the LRU order.
///
/// Field order is the eviction order: least recently accessed first, then
/// oldest insertion, then key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RecencyKey<K> {
    pub(crate) access_tick: u64,
    pub(crate) inserted_tick: u64,
    pub(crate) key: K,
}

/// Position of an entry in the expiration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ExpiryKey<K> {
    pub(crate) expires_at: Instant,
    pub(crate) key: K,
}
