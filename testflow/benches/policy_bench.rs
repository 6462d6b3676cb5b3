//! Benchmarks for outcome classification and result aggregation.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use testflow::context::RunIdentity;
use testflow::core::{StageKind, StageOutcome};
use testflow::lifecycle::ResultAggregator;
use testflow::policy::ExpectedOutcome;
use testflow::process::ProcessStatus;

fn classify_benchmark(c: &mut Criterion) {
    let clean = ExpectedOutcome::clean_run().within("10s").unwrap();
    let server = ExpectedOutcome::never_completes().within("24h").unwrap();
    let observations = [
        (ProcessStatus::Exited(Some(0)), Duration::from_secs(1)),
        (ProcessStatus::Exited(Some(1)), Duration::from_secs(2)),
        (ProcessStatus::Running, Duration::from_secs(10)),
        (ProcessStatus::Exited(None), Duration::from_secs(30)),
    ];

    c.bench_function("classify_clean_exit", |b| {
        b.iter(|| {
            for (status, elapsed) in &observations {
                black_box(clean.classify(*status, *elapsed));
            }
        });
    });

    c.bench_function("classify_never_completes", |b| {
        b.iter(|| {
            for (status, elapsed) in &observations {
                black_box(server.classify(*status, *elapsed));
            }
        });
    });

    c.bench_function("parse_expected_outcome", |b| {
        b.iter(|| black_box(ExpectedOutcome::parse("clean-exit", black_box("1h30m"))));
    });
}

fn aggregate_benchmark(c: &mut Criterion) {
    let outcomes: Vec<StageOutcome> = (0..100)
        .map(|i| {
            if i % 10 == 0 {
                StageOutcome::failed(format!("execute{i}"), StageKind::Execute, Utc::now(), 1.0, "boom")
            } else {
                StageOutcome::passed(format!("execute{i}"), StageKind::Execute, Utc::now(), 1.0)
            }
        })
        .collect();

    c.bench_function("aggregate_100_outcomes", |b| {
        b.iter(|| {
            let mut aggregator = ResultAggregator::new(RunIdentity::new("bench"));
            for outcome in &outcomes {
                aggregator.record(outcome.clone());
            }
            black_box(aggregator.finish().failed_stages().len())
        });
    });
}

criterion_group!(benches, classify_benchmark, aggregate_benchmark);
criterion_main!(benches);
