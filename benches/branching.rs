//! Throughput benchmark for the branching engine + stats accumulator,
//! driven by `criterion` with `harness = false`.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use outbreak_mc::params::{resolve, GroupDist, RawParams};
use outbreak_mc::sim::simulate;

fn bench_simulate(c: &mut Criterion) {
    let raw = RawParams {
        tbar: Some(5.0),
        kappa: Some(2.0),
        g_ave: Some(4.0),
        r0: Some(1.5),
        group: GroupDist::LogPlus1,
        tmax: Some(30.0),
        nstart: Some(1),
        ..Default::default()
    };
    let params = resolve(&raw).expect("valid seed scenario");

    c.bench_function("simulate_1000_paths", |b| {
        b.iter(|| {
            let stats = simulate(black_box(&params), 42, 1000, u32::MAX);
            black_box(stats.summary().n_paths)
        })
    });
}

criterion_group!(benches, bench_simulate);
criterion_main!(benches);
