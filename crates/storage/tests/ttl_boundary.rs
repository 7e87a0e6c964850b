//! TTL and protection-window boundary tests for `HybridCache`.
//!
//! Runs on a paused Tokio clock so deadlines are hit exactly, not
//! approximately.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use realmkeep_storage::{CacheError, HybridCache, HybridCacheConfig};
use tokio::time::advance;

const HOUR: Duration = Duration::from_secs(3_600);

fn small_cache(capacity: usize, trim_target: usize) -> HybridCache<&'static str, u32> {
    HybridCache::new(
        HybridCacheConfig::builder().capacity(capacity).trim_target(trim_target).build().unwrap(),
    )
}

// ============================================================================
// Zero / maximum TTL
// ============================================================================

/// A deadline equal to "now" is already past, so a zero TTL is never readable.
#[tokio::test(start_paused = true)]
async fn test_zero_ttl_is_immediately_expired() {
    let cache = small_cache(10, 5);
    cache.put("ghost", 1, Duration::ZERO).expect("zero ttl put succeeds");

    assert_eq!(cache.get(&"ghost"), None);
    assert!(!cache.contains_key(&"ghost"));
    assert_eq!(cache.len(), 0);
}

/// `Duration::MAX` saturates instead of overflowing the clock.
#[tokio::test(start_paused = true)]
async fn test_max_ttl_saturates() {
    let cache = small_cache(10, 5);
    cache.put("forever", 1, Duration::MAX).expect("max ttl put succeeds");

    advance(HOUR * 24 * 365).await;
    assert_eq!(cache.get(&"forever"), Some(1));
    assert!(cache.time_to_live(&"forever").expect("live") > HOUR);
}

// ============================================================================
// Deadline edge
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_entry_live_until_exact_deadline() {
    let cache = small_cache(10, 5);
    cache.put("k", 7, Duration::from_secs(10)).unwrap();

    advance(Duration::from_millis(9_999)).await;
    assert_eq!(cache.get(&"k"), Some(7));
    assert_eq!(cache.time_to_live(&"k"), Some(Duration::from_millis(1)));

    advance(Duration::from_millis(1)).await;
    assert_eq!(cache.get(&"k"), None, "deadline reached means expired");
    assert_eq!(cache.stats().expirations, 1);
}

/// Reads refresh recency but never push the deadline out.
#[tokio::test(start_paused = true)]
async fn test_reads_do_not_extend_ttl() {
    let cache = small_cache(10, 5);
    cache.put("k", 1, Duration::from_secs(10)).unwrap();

    for _ in 0..9 {
        advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&"k"), Some(1));
    }
    advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get(&"k"), None);
}

/// Replacing a key is the only way to move its deadline.
#[tokio::test(start_paused = true)]
async fn test_replace_restarts_ttl() {
    let cache = small_cache(10, 5);
    cache.put("k", 1, Duration::from_secs(10)).unwrap();
    advance(Duration::from_secs(8)).await;
    cache.put("k", 2, Duration::from_secs(10)).unwrap();
    advance(Duration::from_secs(8)).await;

    assert_eq!(cache.get(&"k"), Some(2));
}

// ============================================================================
// Expired entries make room before LRU does
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_entries_purged_before_lru_eviction() {
    let cache = small_cache(3, 2);
    cache.put("short", 1, Duration::from_secs(1)).unwrap();
    cache.put("a", 2, HOUR).unwrap();
    cache.put("b", 3, HOUR).unwrap();

    advance(Duration::from_secs(2)).await;
    cache.put("c", 4, HOUR).unwrap();

    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.evictions, 0, "purging the dead entry was enough");
    for key in ["a", "b", "c"] {
        assert!(cache.contains_key(&key), "{key} survives");
    }
}

// ============================================================================
// min_live protection window
// ============================================================================

fn protected_cache() -> HybridCache<&'static str, u32> {
    HybridCache::new(
        HybridCacheConfig::builder()
            .capacity(3)
            .trim_target(2)
            .min_live(Duration::from_secs(1))
            .build()
            .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_all_protected_rejects_without_evicting() {
    let cache = protected_cache();
    for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
        cache.put(key, i as u32, HOUR).unwrap();
    }

    let result = cache.put("d", 9, HOUR);
    assert_eq!(result, Err(CacheError::CapacityExhausted { capacity: 3 }));
    assert_eq!(cache.len(), 3, "a rejected insert evicts nothing");
    assert_eq!(cache.stats().rejections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_protection_lapses_after_min_live() {
    let cache = protected_cache();
    for key in ["a", "b", "c"] {
        cache.put(key, 0, HOUR).unwrap();
    }

    advance(Duration::from_secs(1)).await;
    cache.put("d", 1, HOUR).unwrap();

    assert_eq!(cache.len(), 2, "trimmed to trim_target including the new key");
    assert!(cache.contains_key(&"c"));
    assert!(cache.contains_key(&"d"));
}

/// With only some entries evictable, the cache admits as long as it stays
/// within capacity, even if it cannot reach the trim target.
#[tokio::test(start_paused = true)]
async fn test_partial_protection_admits_within_capacity() {
    let cache = protected_cache();
    cache.put("old", 0, HOUR).unwrap();
    advance(Duration::from_secs(2)).await;
    cache.put("young-1", 1, HOUR).unwrap();
    cache.put("young-2", 2, HOUR).unwrap();

    cache.put("new", 3, HOUR).expect("one evictable entry makes room");

    assert_eq!(cache.len(), 3);
    assert!(!cache.contains_key(&"old"));
    assert_eq!(cache.stats().evictions, 1);
}

// ============================================================================
// Sweeper
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sweeper_reclaims_unread_entries() {
    let config = HybridCacheConfig::builder()
        .capacity(100)
        .sweep_interval(Duration::from_secs(30))
        .build()
        .unwrap();
    let cache: Arc<HybridCache<u32, u32>> = Arc::new(HybridCache::new(config));
    cache.start_sweeper();

    for i in 0..50 {
        cache.put(i, i, Duration::from_secs(10)).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(cache.stats().expirations, 50, "swept without any reads");
    cache.shutdown().await;
}
