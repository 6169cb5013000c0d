use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

use ledger_platform::config::{BreakerSettings, RetrySettings};
use ledger_platform::models::TransferRecord;
use ledger_platform::observability::LatencyTimer;
use ledger_platform::resilience::{CircuitBreaker, RetryPolicy};

fn benchmark_request_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_digest");

    group.bench_function("hash_one_transfer", |b| {
        b.iter(|| {
            let digest = TransferRecord::request_digest(black_box(1), black_box(2), black_box(Decimal::from(1000)));
            black_box(digest)
        });
    });

    group.finish();
}

fn benchmark_circuit_breaker(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker");
    let settings = BreakerSettings { failure_rate_threshold: 0.5, window_size: 50, open_duration_ms: 5_000 };

    group.bench_function("before_call_closed", |b| {
        let breaker = CircuitBreaker::new(&settings);
        b.iter(|| black_box(breaker.before_call()));
    });

    group.bench_function("record_success", |b| {
        let breaker = CircuitBreaker::new(&settings);
        b.iter(|| breaker.record(black_box(true)));
    });

    for window in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("record_under_load", window), window, |b, &window| {
            let breaker = CircuitBreaker::new(&BreakerSettings { window_size: window, ..settings.clone() });
            b.iter(|| {
                for i in 0..window {
                    breaker.record(i % 3 != 0);
                }
            });
        });
    }

    group.finish();
}

fn benchmark_retry_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_policy");
    let settings = RetrySettings { max_attempts: 5, initial_backoff_ms: 100, max_backoff_ms: 2_000 };
    let policy = RetryPolicy::new(&settings);

    group.bench_function("delay_for_attempt", |b| {
        b.iter(|| black_box(policy.delay_for(black_box(3))));
    });

    group.bench_function("should_retry", |b| {
        b.iter(|| black_box(policy.should_retry(black_box(3))));
    });

    group.finish();
}

fn benchmark_latency_timer(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_timer");

    group.bench_function("create_and_elapsed", |b| {
        b.iter(|| {
            let timer = LatencyTimer::new();
            let elapsed = timer.elapsed_ms();
            black_box(elapsed)
        });
    });

    group.finish();
}

fn benchmark_uuid_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("uuid");

    group.bench_function("generate_v4", |b| {
        b.iter(|| {
            let id = Uuid::new_v4();
            black_box(id)
        });
    });

    group.bench_function("to_string", |b| {
        let id = Uuid::new_v4();
        b.iter(|| {
            let s = id.to_string();
            black_box(s)
        });
    });

    group.finish();
}

fn benchmark_decimal_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("decimal");

    group.bench_function("addition", |b| {
        let a = Decimal::from(12345);
        let b_val = Decimal::from(67890);
        b.iter(|| {
            let result = a + b_val;
            black_box(result)
        });
    });

    group.bench_function("comparison", |b| {
        let a = Decimal::from(12345);
        let b_val = Decimal::from(67890);
        b.iter(|| {
            let result = a < b_val;
            black_box(result)
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = benchmark_request_digest,
        benchmark_circuit_breaker,
        benchmark_retry_policy,
        benchmark_latency_timer,
        benchmark_uuid_operations,
        benchmark_decimal_operations,
}

criterion_main!(benches);
