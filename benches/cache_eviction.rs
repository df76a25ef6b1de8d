//! In-process cache benchmarks.
//!
//! Inserts past capacity so every write evicts, once per policy, plus a
//! read-heavy mix on a warm cache.
//!
//! Run with: `cargo bench --bench cache_eviction`

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use eventos::infrastructure::cache::{EvictionPolicy, InMemoryCache};
use serde_json::json;
use std::hint::black_box;

const CAPACITY: usize = 1_000;
const WRITES: usize = 5_000;

const POLICIES: [EvictionPolicy; 3] = [
    EvictionPolicy::Lru,
    EvictionPolicy::Lfu,
    EvictionPolicy::Fifo,
];

fn keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("tenant:bench:event:{i}")).collect()
}

fn bench_insert_over_capacity(c: &mut Criterion) {
    let keys = keys(WRITES);
    let mut group = c.benchmark_group("cache_insert_over_capacity");
    group.throughput(Throughput::Elements(WRITES as u64));

    for policy in POLICIES {
        group.bench_with_input(BenchmarkId::from_parameter(policy), &policy, |b, &policy| {
            b.iter(|| {
                let cache = InMemoryCache::new(CAPACITY, policy);
                for key in &keys {
                    black_box(cache.insert(key, json!({ "checked_in": 42 }), None));
                }
                cache.len()
            });
        });
    }
    group.finish();
}

fn bench_hot_reads(c: &mut Criterion) {
    let keys = keys(CAPACITY);
    let mut group = c.benchmark_group("cache_hot_reads");
    group.throughput(Throughput::Elements(CAPACITY as u64));

    for policy in POLICIES {
        let cache = InMemoryCache::new(CAPACITY, policy);
        for key in &keys {
            let _ = cache.insert(key, json!({ "revenue": "1250.00" }), None);
        }
        group.bench_with_input(BenchmarkId::from_parameter(policy), &cache, |b, cache| {
            b.iter(|| {
                for key in &keys {
                    black_box(cache.lookup(key));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert_over_capacity, bench_hot_reads);
criterion_main!(benches);
