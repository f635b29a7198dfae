//! Work distribution for area sweeps.
//!
//! A sweep traces a path from the transmitter to every sample on the
//! edge of the loaded region. Consecutive edge targets form a sector,
//! and sectors are the unit of work handed to the pool. Sector
//! boundaries depend only on the region, never on the thread count,
//! and every grid update is a commutative atomic merge, so any number
//! of threads produces the same grids.

use crate::{progress, CoverageError};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use terrain::{geo::geometry::Coord, ElevationMap, Extent, PathProfiler};

/// How a sweep is run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Worker threads; 0 uses one per core.
    pub threads: usize,

    /// Edge targets per work item.
    pub sector_size: usize,

    /// Draw a progress bar on stderr.
    pub progress: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            sector_size: 64,
            progress: false,
        }
    }
}

/// What a finished map sweep did.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MapSummary {
    pub transmitter: String,
    /// Edge samples a path was traced to.
    pub targets: usize,
    pub sectors: usize,
    /// Pixels this transmitter reached.
    pub pixels: usize,
    /// Pixels the propagation engine refused.
    pub skipped: usize,
    /// Sweep radius (miles), Longley-Rice only.
    pub max_range_miles: Option<f64>,
    pub elapsed_secs: f64,
}

/// Fixed-size worker pool bound to one elevation map.
pub struct Sweep<'a> {
    pub(crate) profiler: PathProfiler<'a>,
    pool: rayon::ThreadPool,
    sector_size: usize,
    progress: bool,
    cancel: Arc<AtomicBool>,
}

impl<'a> Sweep<'a> {
    /// # Errors
    ///
    /// Fails if the worker threads cannot be spawned.
    pub fn new(profiler: PathProfiler<'a>, config: &SweepConfig) -> Result<Self, CoverageError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("sweep-{i}"))
            .build()?;
        Ok(Self {
            profiler,
            pool,
            sector_size: config.sector_size.max(1),
            progress: config.progress,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn profiler(&self) -> &PathProfiler<'a> {
        &self.profiler
    }

    pub fn map(&self) -> &'a ElevationMap {
        self.profiler.map()
    }

    /// Setting the returned flag stops the running sweep, or the next
    /// one to start, between sectors. The sweep it stops clears it.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs `work` on every sector of `targets`, returning results in
    /// sector order.
    pub(crate) fn run<T, F>(&self, label: String, targets: &[Coord<f64>], work: F) -> Result<Vec<T>, CoverageError>
    where
        T: Send,
        F: Fn(&[Coord<f64>]) -> T + Sync,
    {
        let pb = if self.progress {
            progress::bar(label, targets.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        let results = self.pool.install(|| {
            targets
                .par_chunks(self.sector_size)
                .map(|sector| {
                    if self.cancel.load(Ordering::Relaxed) {
                        return Err(CoverageError::Cancelled);
                    }
                    let result = work(sector);
                    pb.inc(sector.len() as u64);
                    Ok(result)
                })
                .collect::<Result<Vec<T>, CoverageError>>()
        });
        pb.finish_and_clear();
        if matches!(results, Err(CoverageError::Cancelled)) {
            self.cancel.store(false, Ordering::Relaxed);
        }
        results
    }

    pub(crate) fn sectors(&self, targets: usize) -> usize {
        targets.div_ceil(self.sector_size)
    }
}

/// Returns every sample on the edge of `extent`: the north edge east
/// to west, the east edge north to south, the south edge east to
/// west, then the west edge south to north.
///
/// Coords are `x` west-positive longitude, `y` latitude.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn edge_targets(extent: &Extent, ppd: usize) -> Vec<Coord<f64>> {
    if extent.is_empty() {
        return Vec::new();
    }
    let dpp = 1.0 / ppd as f64;
    let min_west = f64::from(extent.min_west);
    let max_west = f64::from(extent.max_west);
    let min_north = f64::from(extent.min_north);
    let max_north = f64::from(extent.max_north);
    let width = ((extent.max_west - extent.min_west).rem_euclid(360) as usize) * ppd;
    let height = ((extent.max_north - extent.min_north).max(0) as usize) * ppd;

    let lon_at = |i: usize| (min_west + dpp * (i + 1) as f64).rem_euclid(360.0);
    let mut targets = Vec::with_capacity(2 * (width + height));
    targets.extend((0..width).map(|i| Coord {
        x: lon_at(i),
        y: max_north,
    }));
    targets.extend((0..height).map(|i| Coord {
        x: min_west,
        y: max_north - dpp * (i + 1) as f64,
    }));
    targets.extend((0..width).map(|i| Coord {
        x: lon_at(i),
        y: min_north,
    }));
    targets.extend((0..height).map(|i| Coord {
        x: max_west.rem_euclid(360.0),
        y: min_north + dpp * i as f64,
    }));
    targets
}

/// Counts samples whose mask satisfies `pred`.
pub fn count_mask<F>(map: &ElevationMap, pred: F) -> usize
where
    F: Fn(u8) -> bool,
{
    map.tiles()
        .iter()
        .map(|tile| {
            let ppd = tile.ppd();
            (0..ppd * ppd).filter(|&i| pred(tile.mask(i))).count()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{edge_targets, Sweep, SweepConfig};
    use crate::CoverageError;
    use std::sync::atomic::Ordering;
    use terrain::{geo::geometry::Coord, ElevationMap, Extent, MemoryLoader, Pages, PathProfiler, Resolution};

    #[test]
    fn test_edge_targets() {
        let extent = Extent {
            min_north: 44,
            max_north: 45,
            min_west: 71,
            max_west: 73,
            min_elevation: 0,
            max_elevation: 0,
        };
        let targets = edge_targets(&extent, 4);
        assert_eq!(targets.len(), 2 * (8 + 4));
        assert_eq!(targets[0], Coord { x: 71.25, y: 45.0 });
        assert_eq!(targets[7], Coord { x: 73.0, y: 45.0 });
        assert_eq!(targets[8], Coord { x: 71.0, y: 44.75 });
        assert_eq!(targets[11], Coord { x: 71.0, y: 44.0 });
        assert_eq!(targets[12], Coord { x: 71.25, y: 44.0 });
        assert_eq!(targets[20], Coord { x: 73.0, y: 44.0 });
        assert_eq!(targets[23], Coord { x: 73.0, y: 44.75 });
    }

    #[test]
    fn test_edge_targets_wrap() {
        let extent = Extent {
            min_north: 51,
            max_north: 52,
            min_west: 359,
            max_west: 1,
            min_elevation: 0,
            max_elevation: 0,
        };
        let targets = edge_targets(&extent, 2);
        assert_eq!(targets.len(), 2 * (4 + 2));
        let lons: Vec<f64> = targets[..4].iter().map(|c| c.x).collect();
        assert_eq!(lons, [359.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_cancelled_sweep() {
        let map = ElevationMap::new(Resolution::Standard, Pages::new(1).unwrap());
        map.load_cell(Coord { x: 71, y: 44 }, &MemoryLoader::new()).unwrap();
        let sweep = Sweep::new(PathProfiler::new(&map), &SweepConfig::default()).unwrap();
        sweep.cancel_flag().store(true, Ordering::Relaxed);
        let targets = edge_targets(&map.extent(), map.ppd());
        assert!(matches!(
            sweep.run(String::new(), &targets, <[Coord<f64>]>::len),
            Err(CoverageError::Cancelled)
        ));
        // The flag was consumed; the pool is usable again.
        let sectors = sweep.run(String::new(), &targets, <[Coord<f64>]>::len).unwrap();
        assert_eq!(sectors.len(), sweep.sectors(targets.len()));
        assert_eq!(sectors.iter().sum::<usize>(), targets.len());
    }

    #[test]
    fn test_cancel_mid_sweep() {
        let map = ElevationMap::new(Resolution::Standard, Pages::new(1).unwrap());
        map.load_cell(Coord { x: 71, y: 44 }, &MemoryLoader::new()).unwrap();
        let config = SweepConfig {
            threads: 1,
            sector_size: 16,
            progress: false,
        };
        let sweep = Sweep::new(PathProfiler::new(&map), &config).unwrap();
        let cancel = sweep.cancel_flag();
        let targets = edge_targets(&map.extent(), map.ppd());
        let result = sweep.run(String::new(), &targets, |sector| {
            cancel.store(true, Ordering::Relaxed);
            sector.len()
        });
        assert!(matches!(result, Err(CoverageError::Cancelled)));
        assert!(!cancel.load(Ordering::Relaxed));
        assert!(sweep.run(String::new(), &targets, <[Coord<f64>]>::len).is_ok());
    }
}
