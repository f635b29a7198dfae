use coverage::{LrSettings, Sweep, SweepConfig};
use criterion::{criterion_group, criterion_main, Criterion};
use terrain::{geo::geometry::Coord, ElevationMap, MemoryLoader, Pages, PathProfiler, Resolution, Site};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const CELL: Coord<i32> = Coord { x: 71, y: 44 };

fn hills() -> MemoryLoader {
    MemoryLoader::new().with_cell(CELL, |lat: f64, lon: f64| {
        let z = 600.0 + 400.0 * (lat * 40.0).sin() * (lon * 25.0).cos();
        #[allow(clippy::cast_possible_truncation)]
        let z = z as i16;
        z
    })
}

fn sweeps(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sweep");
    group.sample_size(10);

    let map = ElevationMap::new(Resolution::Standard, Pages::new(1).unwrap());
    map.load_cell(CELL, &hills()).unwrap();
    let sweep = Sweep::new(PathProfiler::new(&map), &SweepConfig::default()).unwrap();
    let tx = Site::new(44.5, 71.5, 100.0);
    let settings = LrSettings {
        max_range_miles: 5.0,
        ..LrSettings::default()
    };

    group.bench_function("los", |b| b.iter(|| sweep.plot_los_map(&tx, 30.0, 0).unwrap()));
    group.bench_function("longley-rice", |b| {
        b.iter(|| sweep.plot_lr_map(&tx, 0, &settings, None).unwrap())
    });
}

criterion_group!(benches, sweeps);
criterion_main!(benches);
