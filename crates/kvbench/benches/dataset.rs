//! Record and dataset generation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvbench::fixtures::{build_dataset_with, RecordGenerator};
use kvbench::identity::{deterministic_id, IdentityGenerator, RECORD_NAMESPACE};

fn bench_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity");

    group.bench_function("deterministic_id", |b| {
        b.iter(|| deterministic_id(&RECORD_NAMESPACE, black_box("user1@domain.com")));
    });

    let mut tokens = IdentityGenerator::seeded(1);
    group.bench_function("random_token", |b| {
        b.iter(|| tokens.random_token());
    });

    group.finish();
}

fn bench_build_dataset(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixtures/build_dataset");

    for size in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut generator = RecordGenerator::seeded(7);
            b.iter(|| build_dataset_with(&mut generator, black_box(size)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_identity, bench_build_dataset);
criterion_main!(benches);
