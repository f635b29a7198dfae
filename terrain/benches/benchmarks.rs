use criterion::{criterion_group, criterion_main, Criterion};
use terrain::{geo::geometry::Coord, ElevationMap, MemoryLoader, Pages, PathProfiler, Resolution, Site};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Rolling hills across the four cells around Mt Washington.
fn hills() -> MemoryLoader {
    let hill = |lat: f64, lon: f64| {
        let z = 600.0 + 400.0 * (lat * 40.0).sin() * (lon * 25.0).cos();
        #[allow(clippy::cast_possible_truncation)]
        let z = z as i16;
        z
    };
    [(71, 44), (72, 44), (71, 43), (72, 43)]
        .into_iter()
        .fold(MemoryLoader::new(), |loader, (x, y)| {
            loader.with_cell(Coord { x, y }, hill)
        })
}

fn terrain_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("Terrain Profile");

    let map = ElevationMap::new(Resolution::Standard, Pages::new(4).unwrap());
    map.load_region(72, 71, 44, 43, &hills()).unwrap();
    let profiler = PathProfiler::new(&map);

    let start = Site::from_east(44.28309806603165, -71.30830716441369, 30.0);
    let short = Site::from_east(44.25628098424278, -71.2972073283768, 10.0);
    let long = Site::from_east(43.6, -72.4, 10.0);

    group.bench_function("short", |b| b.iter(|| profiler.read_path(&start, &short)));
    group.bench_function("long", |b| b.iter(|| profiler.read_path(&start, &long)));
    group.bench_function("haat", |b| b.iter(|| profiler.haat(&start).unwrap()));
}

criterion_group!(benches, terrain_profile);
criterion_main!(benches);
