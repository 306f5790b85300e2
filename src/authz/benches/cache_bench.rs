//! Role cache and resolver hot-path benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rolegate_authz::{CacheConfig, RoleCache, RoleResolver};
use rolegate_core::{InMemoryRoleStore, StoredValue};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn bench_cache_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("role_cache_get");

    for population in [10usize, 1_000, 10_000].iter() {
        let cache = RoleCache::new(CacheConfig::default());
        for i in 0..*population {
            cache.put(&format!("user{}@example.com", i), vec!["Member".to_string()]);
        }

        group.bench_with_input(BenchmarkId::new("users", population), population, |b, _| {
            b.iter(|| black_box(cache.get(black_box("User7@Example.com"))))
        });
    }

    group.finish();
}

fn bench_cache_put(c: &mut Criterion) {
    let cache = RoleCache::new(CacheConfig::default());
    let roles = vec!["Admin".to_string(), "Member".to_string()];

    c.bench_function("role_cache_put", |b| {
        b.iter(|| cache.put(black_box("alice@example.com"), roles.clone()))
    });
}

fn bench_resolve_cached(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryRoleStore::new();
    let resolver = rt.block_on(async {
        store
            .insert("users:alice@example.com:roles", StoredValue::new(r#"["Admin"]"#))
            .await;
        let resolver = RoleResolver::new(
            Arc::new(store),
            Arc::new(RoleCache::new(CacheConfig::default())),
        );
        resolver.resolve("alice@example.com", false).await;
        resolver
    });

    c.bench_function("resolve_cached", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(resolver.resolve("alice@example.com", false).await) })
    });
}

criterion_group!(benches, bench_cache_get, bench_cache_put, bench_resolve_cached);
criterion_main!(benches);
