//! History Benchmarks - Read-path Performance Validation
//!
//! Benchmarks the pure functions run on every history and leaderboard
//! query.
//!
//! Run with: cargo bench --bench history_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use uuid::Uuid;

use balance_tracker::domain::BalanceSample;
use balance_tracker::domain::history::{compress, display_slice};
use balance_tracker::domain::leaderboard::top_n;

fn raw_history() -> Vec<BalanceSample> {
    (0..100_i64)
        .map(|i| BalanceSample {
            identity: Uuid::nil(),
            timestamp_ms: 1_700_000_000_000 - i * 60_000,
            balance: ((i / 3) * 25) as f64,
        })
        .collect()
}

/// Benchmark compression of a full raw history page.
fn bench_compress(c: &mut Criterion) {
    let raw = raw_history();

    c.bench_function("compress_100_rows", |b| {
        b.iter(|| {
            let changes = compress(black_box(&raw));
            let _shown = display_slice(&changes, 10).len();
        });
    });
}

/// Benchmark ranking 10k identities down to the top 100.
fn bench_top_n(c: &mut Criterion) {
    let balances: Vec<_> = (0..10_000_u128)
        .map(|n| (Uuid::from_u128(n), ((n * 7_919) % 10_007) as f64))
        .collect();

    c.bench_function("top_100_of_10k", |b| {
        b.iter(|| top_n(black_box(balances.clone()), 100));
    });
}

criterion_group!(benches, bench_compress, bench_top_n);
criterion_main!(benches);
