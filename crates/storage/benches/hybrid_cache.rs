#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{hint::black_box, sync::Arc, time::Duration};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use realmkeep_storage::{
    HybridCache, HybridCacheConfig,
    auth::{EncryptedSecret, SecretScheme},
};
use tokio::runtime::Runtime;

const TTL: Duration = Duration::from_secs(3_600);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rt() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime")
}

fn populated_cache(capacity: usize, count: usize) -> HybridCache<u64, u64> {
    let config = HybridCacheConfig::builder().capacity(capacity).build().expect("valid config");
    let cache = HybridCache::new(config);
    for i in 0..count as u64 {
        cache.put(i, i, TTL).expect("populate put failed");
    }
    cache
}

// ---------------------------------------------------------------------------
// 1. get
// ---------------------------------------------------------------------------

fn get_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_operations");
    let rt = rt();
    let _guard = rt.enter();

    for &size in &[1_000usize, 100_000] {
        let cache = populated_cache(size + 1, size);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("hit", size), &size, |b, &size| {
            let mut i = 0u64;
            b.iter(|| {
                i = (i + 1) % size as u64;
                black_box(cache.get(&i))
            });
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            b.iter(|| black_box(cache.get(&u64::MAX)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. put (replace vs. admit-with-eviction)
// ---------------------------------------------------------------------------

fn put_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_operations");
    let rt = rt();
    let _guard = rt.enter();

    let cache = populated_cache(10_001, 10_000);
    group.bench_function("replace_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 1) % 10_000;
            cache.put(black_box(i), i, TTL).unwrap();
        });
    });

    for &capacity in &[1_000usize, 10_000] {
        let cache = populated_cache(capacity, capacity);
        group.bench_with_input(
            BenchmarkId::new("admit_at_capacity", capacity),
            &capacity,
            |b, &capacity| {
                let mut next = capacity as u64;
                b.iter(|| {
                    next += 1;
                    cache.put(black_box(next), next, TTL).unwrap();
                });
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. expiry purge
// ---------------------------------------------------------------------------

fn purge_expired(c: &mut Criterion) {
    let mut group = c.benchmark_group("purge_expired");
    let rt = rt();
    let _guard = rt.enter();

    for &count in &[1_000usize, 50_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let config = HybridCacheConfig::builder()
                        .capacity(count + 1)
                        .build()
                        .expect("valid config");
                    let cache = Arc::new(HybridCache::<u64, u64>::new(config));
                    for i in 0..count as u64 {
                        cache.put(i, i, Duration::ZERO).unwrap();
                    }
                    cache
                },
                |cache| black_box(cache.purge_expired()),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. secret verification per scheme
// ---------------------------------------------------------------------------

fn secret_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("secret_match");
    group.sample_size(20);

    let sha = EncryptedSecret::hash_sha256(b"benchmark-secret");
    let argon = EncryptedSecret::hash_argon2id(b"benchmark-secret").expect("argon2 hash");
    for secret in [sha, argon] {
        let scheme: SecretScheme = secret.scheme();
        group.bench_function(scheme.as_wire(), |b| {
            b.iter(|| black_box(secret.is_match(black_box(b"benchmark-secret"))));
        });
    }
    group.finish();
}

criterion_group!(benches, get_operations, put_operations, purge_expired, secret_match);
criterion_main!(benches);
