use async_trait::async_trait;
use criterion::{Criterion, criterion_group, criterion_main};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use strata_cache::{CachePolicy, CacheStore, ConfigResolver, DormantSweeper, Source};
use strata_core::{ContextPath, FallbackKey, LoadError};
use tokio::runtime::Runtime;

/// Answers only the common key, so every resolution walks the full sequence.
struct CommonOnly;

#[async_trait]
impl Source<FallbackKey<u64>, String> for CommonOnly {
    async fn load(&self, key: &FallbackKey<u64>) -> Result<Option<String>, LoadError> {
        Ok(key.is_common().then(|| format!("definition-{}", key.identity())))
    }

    fn name(&self) -> &str {
        "common-only"
    }
}

fn store(rt: &Runtime) -> Arc<CacheStore<FallbackKey<u64>, String>> {
    let _guard = rt.enter();
    let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(60)));
    let store = CacheStore::<FallbackKey<u64>, String>::new(
        "bench",
        CachePolicy::default(),
        Arc::new(CommonOnly),
        sweeper,
    );
    store.initialize().unwrap();
    store
}

fn deep_key(identity: u64) -> FallbackKey<u64> {
    let path: ContextPath = "1.10-2.20-3.30".parse().unwrap();
    FallbackKey::new(identity)
        .with_tenant(5)
        .with_client(3)
        .with_product(2)
        .with_context(path)
}

/// Benchmark: Cache get (hit)
fn bench_cache_get_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = store(&rt);
    let key = FallbackKey::new(7u64);

    rt.block_on(async {
        store.get(&key).await.unwrap();
    });

    c.bench_function("cache_get_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let result = store.get(&key).await;
            std::hint::black_box(result)
        });
    });
}

/// Benchmark: Cache get (miss)
fn bench_cache_get_miss(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = store(&rt);
    let counter = Arc::new(AtomicU64::new(0));

    c.bench_function("cache_get_miss", |b| {
        b.to_async(&rt).iter(|| {
            let store = Arc::clone(&store);
            let counter = Arc::clone(&counter);
            async move {
                let identity = counter.fetch_add(1, Ordering::Relaxed);
                let result = store.get(&FallbackKey::new(identity)).await;
                std::hint::black_box(result)
            }
        });
    });
}

/// Benchmark: resolution through a warm cache, full walk
fn bench_resolve_warm(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let resolver = ConfigResolver::new(store(&rt));
    let key = deep_key(7);

    rt.block_on(async {
        resolver.get_first(&key).await.unwrap();
    });

    c.bench_function("resolve_warm_full_walk", |b| {
        b.to_async(&rt).iter(|| async {
            let result = resolver.get_first(&key).await;
            std::hint::black_box(result)
        });
    });
}

/// Benchmark: Concurrencia - multiples gets simultaneos
fn bench_cache_concurrent_gets(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = store(&rt);

    rt.block_on(async {
        for i in 0..1000u64 {
            store.get(&FallbackKey::new(i)).await.unwrap();
        }
    });

    c.bench_function("cache_concurrent_gets_100", |b| {
        b.to_async(&rt).iter(|| {
            let store = Arc::clone(&store);
            async move {
                let handles: Vec<_> = (0..100u64)
                    .map(|i| {
                        let store = Arc::clone(&store);
                        tokio::spawn(async move { store.get(&FallbackKey::new(i % 1000)).await.is_ok() })
                    })
                    .collect();

                for handle in handles {
                    let _ = handle.await;
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_cache_get_hit,
    bench_cache_get_miss,
    bench_resolve_warm,
    bench_cache_concurrent_gets,
);

criterion_main!(benches);
