use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use itm::{p2p, Model, Params};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn rolling_terrain(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f64;
            120.0 + 60.0 * (x / 90.0).sin() + 15.0 * (x / 7.0).cos()
        })
        .collect()
}

fn point_to_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("Point to Point");
    let params = Params::default();

    for len in [100, 1000, 4000] {
        let terrain = rolling_terrain(len);
        for model in [Model::Itm, Model::Itwom] {
            group.bench_with_input(
                BenchmarkId::new(format!("{model:?}"), len),
                &terrain,
                |b, terrain| b.iter(|| p2p(model, 30.0, 2.0, 90.0, terrain, &params).unwrap()),
            );
        }
    }
}

criterion_group!(benches, point_to_point);
criterion_main!(benches);
