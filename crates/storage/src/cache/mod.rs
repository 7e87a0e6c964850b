//! Bounded in-memory cache with hybrid LRU + TTL eviction.
//!
//! [`HybridCache`] combines two independent removal policies:
//!
//! - **TTL**: every entry carries an absolute deadline fixed at insertion. Reads never return an
//!   entry past its deadline, and a background sweeper removes dead entries every
//!   `sweep_interval`. Reading does not extend the deadline.
//! - **LRU with a protection floor**: when a new key would push the cache past `capacity`, the
//!   least recently used entries are evicted until the cache is down to `trim_target`. Entries
//!   younger than `min_live` are skipped, so a burst of fresh inserts is not evicted before it is
//!   ever read.
//!
//! # Eviction Order
//!
//! ```text
//! put(new key) with len == capacity
//!   → purge expired entries
//!   → still full? order evictable entries by (last access, insertion, key)
//!   → evict from the front until len + 1 <= trim_target
//!   → protected entries alone would overflow capacity? reject with CapacityExhausted
//! ```
//!
//! # Concurrency
//!
//! All state sits behind one [`parking_lot::Mutex`]; each operation holds it
//! only for map and index bookkeeping. Eviction listeners run after the lock
//! is released. The sweeper removes at most [`SWEEP_BATCH_SIZE`] entries per
//! lock acquisition and yields between batches.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use realmkeep_storage::cache::{HybridCache, HybridCacheConfig};
//!
//! let config = HybridCacheConfig::builder().capacity(3).trim_target(2).build()?;
//! let cache = HybridCache::new(config);
//!
//! cache.put("a", 1, Duration::from_secs(60))?;
//! cache.put("b", 2, Duration::from_secs(60))?;
//! cache.put("c", 3, Duration::from_secs(60))?;
//! assert_eq!(cache.get(&"a"), Some(1)); // "a" is now the most recent
//!
//! cache.put("d", 4, Duration::from_secs(60))?; // evicts "b" and "c"
//! assert_eq!(cache.get(&"b"), None);
//! assert_eq!(cache.get(&"a"), Some(1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod entry;
mod stats;
mod sweeper;

use std::{
    collections::{BTreeSet, HashMap},
    hash::Hash,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    time::Duration,
};

pub use config::{DEFAULT_SWEEP_INTERVAL, HybridCacheConfig};
pub use entry::CacheEntry;
use entry::{ExpiryKey, RecencyKey};
use parking_lot::Mutex;
pub use stats::CacheStatsSnapshot;
use stats::CacheStats;
pub use sweeper::SWEEP_BATCH_SIZE;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;

/// Why an entry left the cache without the caller asking for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// The entry's deadline passed.
    Expired,
    /// The entry was chosen by an LRU eviction pass.
    Evicted,
}

/// Callback invoked for entries removed by expiration or eviction.
///
/// Runs outside the cache lock. A panic inside the listener is caught and
/// logged.
pub type EvictionListener<K, V> = Arc<dyn Fn(&K, &V, RemovalCause) + Send + Sync>;

/// Bounded key/value cache with LRU capacity control and per-entry TTL.
///
/// See the [module documentation](self) for the eviction algorithm.
///
/// # Background Sweep
///
/// Construction does not spawn anything. Call
/// [`start_sweeper`](Self::start_sweeper) on an `Arc<HybridCache>` to run
/// the periodic expiration sweep. The sweeper stops on
/// [`shutdown`](Self::shutdown) or when the last `Arc` is dropped. A cache
/// that was shut down can be swept again by calling `start_sweeper` anew.
pub struct HybridCache<K, V> {
    inner: Mutex<CacheInner<K, V>>,
    config: HybridCacheConfig,
    stats: CacheStats,
    listener: Option<EvictionListener<K, V>>,
    cancel_token: Mutex<CancellationToken>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// State guarded by the cache mutex.
struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<K, V>>,
    recency: BTreeSet<RecencyKey<K>>,
    expiry: BTreeSet<ExpiryKey<K>>,
    clock: u64,
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Ord + Clone,
{
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeSet::new(),
            expiry: BTreeSet::new(),
            clock: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Inserts `entry`, returning the entry it replaced.
    fn attach(&mut self, entry: CacheEntry<K, V>) -> Option<CacheEntry<K, V>> {
        let previous = self.detach(entry.key());
        self.recency.insert(entry.recency_key());
        self.expiry.insert(entry.expiry_key());
        self.entries.insert(entry.key().clone(), entry);
        previous
    }

    fn detach(&mut self, key: &K) -> Option<CacheEntry<K, V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.recency_key());
        self.expiry.remove(&entry.expiry_key());
        Some(entry)
    }

    fn touch(&mut self, key: &K, now: Instant) -> Option<&CacheEntry<K, V>> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.recency_key());
        entry.touch(now, tick);
        self.recency.insert(entry.recency_key());
        Some(&*entry)
    }

    /// Removes up to `limit` entries whose deadline is at or before `now`,
    /// earliest deadline first.
    fn pop_expired(&mut self, now: Instant, limit: usize) -> Vec<CacheEntry<K, V>> {
        let keys: Vec<K> = self
            .expiry
            .iter()
            .take_while(|slot| slot.expires_at <= now)
            .take(limit)
            .map(|slot| slot.key.clone())
            .collect();
        keys.iter().filter_map(|key| self.detach(key)).collect()
    }

    fn expired_count(&self, now: Instant) -> usize {
        self.expiry.iter().take_while(|slot| slot.expires_at <= now).count()
    }

    /// Picks up to `wanted` evictable keys in LRU order, skipping entries
    /// younger than `min_live`.
    fn eviction_candidates(&self, now: Instant, min_live: Duration, wanted: usize) -> Vec<K> {
        self.recency
            .iter()
            .filter(|slot| {
                self.entries.get(&slot.key).is_some_and(|entry| entry.age(now) >= min_live)
            })
            .take(wanted)
            .map(|slot| slot.key.clone())
            .collect()
    }
}

impl<K, V> HybridCache<K, V>
where
    K: Eq + Hash + Ord + Clone,
    V: Clone,
{
    /// Creates an empty cache. No background task is started.
    #[must_use]
    pub fn new(config: HybridCacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner::new()),
            config,
            stats: CacheStats::default(),
            listener: None,
            cancel_token: Mutex::new(CancellationToken::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Registers a callback for entries removed by expiration or eviction.
    #[must_use]
    pub fn with_eviction_listener(
        mut self,
        listener: impl Fn(&K, &V, RemovalCause) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Inserts or replaces `key` with a fresh deadline of `now + ttl`.
    ///
    /// Replacing an existing key resets its insertion time, last access and
    /// deadline, and never triggers eviction. Admitting a new key into a full
    /// cache runs an eviction pass first.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::CapacityExhausted`] when the cache is full and
    /// too few entries are outside their `min_live` window to make room. In
    /// that case nothing is evicted and the cache is unchanged.
    pub fn put(&self, key: K, value: V, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut removed = Vec::new();
        let result = {
            let mut inner = self.inner.lock();
            let tick = inner.next_tick();
            let entry = CacheEntry::new(key, value, now, tick, ttl);
            if inner.entries.contains_key(entry.key()) {
                inner.attach(entry);
                Ok(())
            } else {
                self.admit(&mut inner, entry, now, &mut removed)
            }
        };
        self.notify(removed);
        result
    }

    fn admit(
        &self,
        inner: &mut CacheInner<K, V>,
        entry: CacheEntry<K, V>,
        now: Instant,
        removed: &mut Vec<(CacheEntry<K, V>, RemovalCause)>,
    ) -> Result<(), CacheError> {
        let capacity = self.config.capacity();

        if inner.entries.len() >= capacity {
            let expired = inner.pop_expired(now, usize::MAX);
            self.stats.record_expirations(expired.len());
            removed.extend(expired.into_iter().map(|entry| (entry, RemovalCause::Expired)));
        }

        if inner.entries.len() >= capacity {
            // Count after admission is len + 1; shrink that to the trim target.
            let excess = inner.entries.len() + 1 - self.config.trim_target();
            let victims = inner.eviction_candidates(now, self.config.min_live(), excess);
            if inner.entries.len() + 1 - victims.len() > capacity {
                self.stats.record_rejection();
                tracing::warn!(
                    capacity,
                    protected = inner.entries.len() - victims.len(),
                    "cache full of protected entries, rejecting insert"
                );
                return Err(CacheError::CapacityExhausted { capacity });
            }
            for key in &victims {
                if let Some(victim) = inner.detach(key) {
                    removed.push((victim, RemovalCause::Evicted));
                }
            }
            self.stats.record_evictions(victims.len());
            tracing::debug!(
                evicted = victims.len(),
                remaining = inner.entries.len() + 1,
                "capacity eviction pass"
            );
        }

        inner.attach(entry);
        self.stats.record_insertion();
        Ok(())
    }

    /// Returns the live value for `key`, refreshing its recency.
    ///
    /// An entry past its deadline is never returned, even if the sweeper has
    /// not reached it yet; it is dropped on the spot.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = {
            let mut inner = self.inner.lock();
            match inner.entries.get(key).map(|entry| entry.is_expired(now)) {
                None => None,
                Some(true) => inner.detach(key),
                Some(false) => {
                    let value = inner.touch(key, now).map(|entry| entry.value().clone());
                    self.stats.record_hit();
                    return value;
                },
            }
        };
        self.stats.record_miss();
        if let Some(entry) = expired {
            self.stats.record_expirations(1);
            self.notify(vec![(entry, RemovalCause::Expired)]);
        }
        None
    }

    /// Returns the remaining time to live of a live entry, without touching it.
    pub fn time_to_live(&self, key: &K) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.time_to_live(now))
    }

    /// Returns `true` if `key` holds a live entry. Does not refresh recency.
    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.inner.lock().entries.get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    /// Removes `key`, returning its value if it was live. Idempotent.
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entry = self.inner.lock().detach(key)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(entry.into_parts().1)
    }

    /// Removes `key` only if its current value satisfies `predicate`,
    /// returning the removed value.
    ///
    /// The check and the removal happen under one lock acquisition, so a
    /// value written by a concurrent [`put`](Self::put) is tested, never
    /// removed blindly. Expired entries are dropped regardless and yield
    /// `None`.
    pub fn remove_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let entry = inner.entries.get(key)?;
        if entry.is_expired(now) {
            inner.detach(key);
            return None;
        }
        if !predicate(entry.value()) {
            return None;
        }
        inner.detach(key).map(|entry| entry.into_parts().1)
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.lock();
        inner.entries.len() - inner.expired_count(now)
    }

    /// Returns `true` if the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Listeners are not notified.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
        inner.expiry.clear();
    }

    /// Removes every expired entry now, in batches, returning the count.
    ///
    /// This is what the background sweeper runs each tick; it is public so
    /// callers without a runtime can sweep on their own schedule.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut total = 0;
        loop {
            let removed = self.sweep_batch(now, SWEEP_BATCH_SIZE);
            total += removed;
            if removed < SWEEP_BATCH_SIZE {
                return total;
            }
        }
    }

    /// Removes up to `limit` expired entries under a single lock acquisition.
    fn sweep_batch(&self, now: Instant, limit: usize) -> usize {
        let expired = self.inner.lock().pop_expired(now, limit);
        let count = expired.len();
        if count > 0 {
            self.stats.record_expirations(count);
            tracing::trace!(count, "swept expired entries");
            self.notify(expired.into_iter().map(|entry| (entry, RemovalCause::Expired)).collect());
        }
        count
    }

    /// Returns a snapshot of the activity counters.
    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the configuration this cache was built with.
    #[must_use]
    pub fn config(&self) -> &HybridCacheConfig {
        &self.config
    }

    fn notify(&self, removed: Vec<(CacheEntry<K, V>, RemovalCause)>) {
        let Some(listener) = &self.listener else {
            return;
        };
        for (entry, cause) in removed {
            let outcome =
                catch_unwind(AssertUnwindSafe(|| listener(entry.key(), entry.value(), cause)));
            if outcome.is_err() {
                tracing::error!(?cause, "eviction listener panicked");
            }
        }
    }
}

impl<K, V> HybridCache<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts the background expiration sweep for this cache.
    ///
    /// Calling this more than once has no effect while a sweeper is running.
    /// After [`shutdown`](Self::shutdown) it starts a fresh sweeper.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime context.
    pub fn start_sweeper(self: &Arc<Self>) {
        let mut slot = self.sweeper.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let token = {
            let mut current = self.cancel_token.lock();
            if current.is_cancelled() {
                *current = CancellationToken::new();
            }
            current.clone()
        };
        *slot = Some(sweeper::spawn(self, token));
    }

    /// Returns `true` while the background sweeper task is alive.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the background sweeper and waits for it to exit.
    ///
    /// Cached entries are kept; the cache remains usable and
    /// [`start_sweeper`](Self::start_sweeper) may be called again.
    pub async fn shutdown(&self) {
        self.cancel_token.lock().cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle
            && let Err(err) = handle.await
        {
            tracing::warn!(error = %err, "cache sweeper task panicked");
        }
    }
}

impl<K, V> Drop for HybridCache<K, V> {
    fn drop(&mut self) {
        self.cancel_token.get_mut().cancel();
    }
}

impl<K, V> std::fmt::Debug for HybridCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridCache")
            .field("config", &self.config)
            .field("resident", &self.inner.lock().entries.len())
            .finish_non_exhaustive()
    }
}
