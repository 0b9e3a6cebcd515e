use std::sync::Arc;
use std::time::Duration;

use common::JobId;
use criterion::{Criterion, criterion_group, criterion_main};
use job_store::{DeduplicationGuard, InMemoryKvStore, KeyValueStore, ProgressTracker};

fn bench_put_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("job_store/put_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryKvStore::new();
                store
                    .put("k", serde_json::json!({"v": 1}), Duration::from_secs(60))
                    .await
                    .unwrap();
                store.get("k").await.unwrap();
            });
        });
    });
}

fn bench_cas_insert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("job_store/cas_insert", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryKvStore::new();
                store
                    .compare_and_swap(
                        "k",
                        None,
                        Some(serde_json::json!({"v": 1})),
                        Duration::from_secs(60),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_try_acquire(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("job_store/try_acquire", |b| {
        b.iter(|| {
            rt.block_on(async {
                let guard = DeduplicationGuard::new(Arc::new(InMemoryKvStore::new()));
                guard.try_acquire("acme").await.unwrap();
            });
        });
    });
}

fn bench_advance(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("job_store/advance", |b| {
        b.iter(|| {
            rt.block_on(async {
                let tracker = ProgressTracker::new(Arc::new(InMemoryKvStore::new()));
                let job_id = JobId::new();
                tracker.register(job_id, "acme").await.unwrap();
                tracker
                    .advance(job_id, 30, "create_tenant", "Creating tenant record...")
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_put_get,
    bench_cas_insert,
    bench_try_acquire,
    bench_advance
);
criterion_main!(benches);
