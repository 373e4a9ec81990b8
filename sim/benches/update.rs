//! Tick cost of a fully generated city.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rampage_sim::{SimConfig, SimWorld};

fn seeded(civilians: u32) -> SimWorld {
    SimWorld::with_config(SimConfig {
        seed: Some(1),
        civilian_count: civilians,
        ..Default::default()
    })
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for civilians in [500, 2500] {
        group.bench_function(format!("{civilians}_civilians"), |b| {
            let mut sim = seeded(civilians);
            b.iter(|| sim.update(black_box(16.0)));
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut sim = seeded(500);
    sim.update(16.0);
    c.bench_function("snapshot_500_civilians", |b| b.iter(|| black_box(sim.snapshot())));
}

criterion_group!(benches, bench_update, bench_snapshot);
criterion_main!(benches);
