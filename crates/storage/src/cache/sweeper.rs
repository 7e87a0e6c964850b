//! Background expiration sweep for [`HybridCache`].

use std::{
    hash::Hash,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Weak},
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use tokio_util::sync::CancellationToken;

use super::HybridCache;

/// Maximum number of expired entries removed per lock acquisition.
pub const SWEEP_BATCH_SIZE: usize = 256;

/// Spawns the sweep loop for `cache`.
///
/// The task holds only a [`Weak`] reference between ticks, so it never keeps
/// the cache alive; it exits when the cache is dropped or `token` fires.
pub(super) fn spawn<K, V>(
    cache: &Arc<HybridCache<K, V>>,
    token: CancellationToken,
) -> JoinHandle<()>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let weak = Arc::downgrade(cache);
    let interval = cache.config.sweep_interval();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the first sweep
        // happens one full interval after start.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("cache sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if !sweep_once(&weak).await {
                        tracing::debug!("cache dropped, sweeper exiting");
                        break;
                    }
                }
            }
        }
    })
}

/// Runs one sweep pass. Returns `false` once the cache is gone.
async fn sweep_once<K, V>(weak: &Weak<HybridCache<K, V>>) -> bool
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let Some(cache) = weak.upgrade() else {
        return false;
    };

    let now = Instant::now();
    let mut removed = 0;
    loop {
        match catch_unwind(AssertUnwindSafe(|| cache.sweep_batch(now, SWEEP_BATCH_SIZE))) {
            Ok(count) => {
                removed += count;
                if count < SWEEP_BATCH_SIZE {
                    break;
                }
            },
            Err(_) => {
                tracing::error!(removed, "cache sweep batch panicked, resuming next interval");
                break;
            },
        }
        // Let foreground operations take the lock between batches.
        tokio::task::yield_now().await;
    }

    cache.stats.record_sweep();
    tracing::debug!(removed, remaining = cache.len(), "cache sweep complete");
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::HybridCacheConfig;

    fn sweeping_cache(interval: Duration) -> Arc<HybridCache<u32, u32>> {
        let config = HybridCacheConfig::builder()
            .capacity(10_000)
            .sweep_interval(interval)
            .build()
            .unwrap();
        Arc::new(HybridCache::new(config))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let cache = sweeping_cache(Duration::from_secs(1));
        cache.start_sweeper();
        assert!(cache.is_sweeping());

        for i in 0..1_000 {
            cache.put(i, i, Duration::from_millis(500)).unwrap();
        }
        cache.put(u32::MAX, 0, Duration::from_secs(3600)).unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let stats = cache.stats();
        assert!(stats.sweeps >= 1);
        assert_eq!(stats.expirations, 1_000);
        assert_eq!(cache.len(), 1);
        cache.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweeper() {
        let cache = sweeping_cache(Duration::from_secs(1));
        cache.start_sweeper();
        cache.shutdown().await;
        assert!(!cache.is_sweeping());

        cache.put(1, 1, Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.stats().sweeps, 0, "no sweep runs after shutdown");

        // Reads still honor the deadline without the sweeper.
        assert_eq!(cache.get(&1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_restarts_after_shutdown() {
        let cache = sweeping_cache(Duration::from_secs(1));
        cache.start_sweeper();
        cache.shutdown().await;

        cache.start_sweeper();
        assert!(cache.is_sweeping());

        cache.put(1, 1, Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(cache.is_sweeping(), "restarted sweeper keeps running");
        assert!(cache.stats().sweeps >= 1);
        assert_eq!(cache.stats().expirations, 1);
        cache.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_exits_when_cache_dropped() {
        let cache = sweeping_cache(Duration::from_secs(1));
        cache.start_sweeper();
        let handle = cache.sweeper.lock().take().unwrap();

        drop(cache);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper exits after the cache is dropped")
            .expect("sweeper does not panic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sweeper_is_idempotent() {
        let cache = sweeping_cache(Duration::from_secs(1));
        cache.start_sweeper();
        cache.start_sweeper();
        assert!(cache.is_sweeping());
        cache.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_listener_does_not_stop_sweeper() {
        let config = HybridCacheConfig::builder()
            .capacity(100)
            .sweep_interval(Duration::from_secs(1))
            .build()
            .unwrap();
        let cache = Arc::new(
            HybridCache::<u32, u32>::new(config)
                .with_eviction_listener(|_, _, _| panic!("listener blew up")),
        );
        cache.start_sweeper();

        cache.put(1, 1, Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        cache.put(2, 2, Duration::from_millis(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert!(cache.stats().sweeps >= 2);
        assert!(cache.is_sweeping());
        assert_eq!(cache.len(), 0);
        cache.shutdown().await;
    }
}
