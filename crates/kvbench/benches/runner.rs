//! Runner overhead against the in-process store.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kvbench::backends::MemoryStore;
use kvbench::{BenchConfig, Runner, Workload};

fn bench_runner(c: &mut Criterion) {
    let mut group = c.benchmark_group("runner/memory");
    group.sample_size(20);

    for workload in [Workload::Insert, Workload::Get] {
        group.bench_with_input(
            BenchmarkId::new(workload.label(), 1_000),
            &workload,
            |b, &workload| {
                let store = MemoryStore::new();
                let mut runner = Runner::new(BenchConfig::new(1_000).with_seed(3));
                b.iter(|| runner.run("bench", &store, workload).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_runner);
criterion_main!(benches);
