//! Geometric line-of-sight coverage.

use crate::{
    mask,
    sweep::{count_mask, edge_targets, MapSummary, Sweep},
    CoverageError,
};
use log::info;
use std::time::Instant;
use terrain::{constants::METERS_PER_MILE, geo::geometry::Coord, math::cos_angle, PathProfiler, Site};

/// ORs `bit` into the mask of every sample on the path from `source`
/// to `destination` that a receiver at `destination`'s height would
/// see `source` from.
pub fn plot_path(profiler: &PathProfiler<'_>, source: &Site, destination: &Site, bit: u8) {
    let map = profiler.map();
    let path = profiler.read_path(source, destination);
    let Some(&ground) = path.elevation().first() else {
        return;
    };
    let er = profiler.earth_radius_m();
    let clutter = profiler.clutter_m();
    let tx_r = er + source.to_agl(ground).alt_m() + ground;
    let rx_alt_m = map.agl(destination).alt_m();

    for y in 0..path.len() {
        let Coord { x: lon, y: lat } = path.coords()[y];
        if map.get_mask(lat, lon) & bit != 0 {
            continue;
        }
        let rx_r = er + rx_alt_m + path.elevation()[y];
        let d_y = METERS_PER_MILE * path.distance()[y];
        let cos_xmtr = cos_angle(rx_r, d_y, tx_r);
        // Walk back toward the transmitter looking for terrain that
        // rises above the line of sight.
        let blocked = (0..y).rev().any(|x| {
            let z = path.elevation()[x];
            let test_r = er + if z == 0.0 { z } else { z + clutter };
            let d = METERS_PER_MILE * (path.distance()[y] - path.distance()[x]);
            cos_xmtr >= cos_angle(rx_r, d, test_r)
        });
        if !blocked {
            map.or_mask(lat, lon, bit);
        }
    }
}

impl Sweep<'_> {
    /// Marks every sample of the loaded region a receiver
    /// `rx_alt_ft` above ground can see `tx` from.
    ///
    /// `tx_index` (zero based) picks the mask bit; see
    /// [`mask::los_bit`].
    ///
    /// # Errors
    ///
    /// Fails if nothing is loaded or the sweep is cancelled.
    pub fn plot_los_map(&self, tx: &Site, rx_alt_ft: f64, tx_index: usize) -> Result<MapSummary, CoverageError> {
        let now = Instant::now();
        let map = self.map();
        let extent = map.extent();
        if extent.is_empty() {
            return Err(CoverageError::EmptyMap);
        }
        let targets = edge_targets(&extent, map.ppd());
        let bit = mask::los_bit(tx_index);
        info!(
            "los map; tx: {:?}, targets: {}, threads: {}",
            tx.name(),
            targets.len(),
            self.threads()
        );

        self.run(format!("LOS {}", tx.name()), &targets, |sector| {
            for target in sector {
                let rx = Site::new(target.y, target.x, rx_alt_ft);
                plot_path(&self.profiler, tx, &rx, bit);
            }
        })?;

        let summary = MapSummary {
            transmitter: tx.name().to_owned(),
            targets: targets.len(),
            sectors: self.sectors(targets.len()),
            pixels: count_mask(map, |m| m & bit != 0),
            skipped: 0,
            max_range_miles: None,
            elapsed_secs: now.elapsed().as_secs_f64(),
        };
        info!("los map done; {summary:?}");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::plot_path;
    use crate::{mask, sweep::count_mask, Sweep, SweepConfig};
    use terrain::{geo::geometry::Coord, ElevationMap, MemoryLoader, Pages, PathProfiler, Resolution, Site};

    const CELL: Coord<i32> = Coord { x: 71, y: 44 };

    fn ridge_map() -> ElevationMap {
        let ridge = |lat: f64, _| if (44.50..44.52).contains(&lat) { 500 } else { 0 };
        let map = ElevationMap::new(Resolution::Standard, Pages::new(1).unwrap());
        map.load_cell(CELL, &MemoryLoader::new().with_cell(CELL, ridge)).unwrap();
        map
    }

    #[test]
    fn test_ridge_shadows_path() {
        let map = ridge_map();
        let profiler = PathProfiler::new(&map);
        let tx = Site::new(44.3, 71.5, 100.0);
        plot_path(&profiler, &tx, &Site::new(44.9, 71.5, 30.0), 1);

        // In front of the ridge is visible, behind it is not.
        assert_eq!(map.get_mask(44.35, 71.5), 1);
        assert_eq!(map.get_mask(44.51, 71.5), 1);
        assert_eq!(map.get_mask(44.6, 71.5), 0);
        assert_eq!(map.get_mask(44.9, 71.5), 0);
    }

    #[test]
    fn test_amsl_sites_match_agl() {
        let plateau = |lat: f64, _| if (44.50..44.52).contains(&lat) { 700 } else { 200 };
        let plot = |tx: Site, rx: Site| {
            let map = ElevationMap::new(Resolution::Standard, Pages::new(1).unwrap());
            map.load_cell(CELL, &MemoryLoader::new().with_cell(CELL, plateau)).unwrap();
            plot_path(&PathProfiler::new(&map), &tx, &rx, 1);
            [44.35, 44.45, 44.51, 44.6, 44.9].map(|lat| map.get_mask(lat, 71.5))
        };
        let ground_ft = 200.0 / 0.3048;
        let agl = plot(Site::new(44.3, 71.5, 100.0), Site::new(44.9, 71.5, 30.0));
        let amsl = plot(
            Site::new(44.3, 71.5, 100.0 + ground_ft).above_sea_level(true),
            Site::new(44.9, 71.5, 30.0 + ground_ft).above_sea_level(true),
        );
        assert_eq!(agl, [1, 1, 1, 0, 0]);
        assert_eq!(amsl, agl);
    }

    #[test]
    fn test_los_map_bits_accumulate() {
        let map = ridge_map();
        let sweep = Sweep::new(PathProfiler::new(&map), &SweepConfig::default()).unwrap();
        let south = Site::new(44.3, 71.5, 100.0).named("south");
        let north = Site::new(44.7, 71.5, 100.0).named("north");

        let first = sweep.plot_los_map(&south, 30.0, 0).unwrap();
        let second = sweep.plot_los_map(&north, 30.0, 1).unwrap();
        assert_eq!(first.transmitter, "south");
        assert_eq!(first.targets, 4 * 1200);
        assert!(first.pixels > 0 && second.pixels > 0);

        // Each side of the ridge sees only its own transmitter.
        assert_eq!(map.get_mask(44.35, 71.5), mask::los_bit(0));
        assert_eq!(map.get_mask(44.65, 71.5), mask::los_bit(1));
        // The ridge top sees both.
        assert_eq!(map.get_mask(44.51, 71.5), mask::los_bit(0) | mask::los_bit(1));
        assert_eq!(count_mask(&map, |m| m & 1 != 0), first.pixels);
    }

    #[test]
    fn test_thread_count_does_not_matter() {
        let snapshot = |threads: usize| {
            let map = ridge_map();
            let config = SweepConfig {
                threads,
                sector_size: 16,
                progress: false,
            };
            let sweep = Sweep::new(PathProfiler::new(&map), &config).unwrap();
            sweep.plot_los_map(&Site::new(44.3, 71.5, 100.0), 30.0, 0).unwrap();
            let tile = map.tile(CELL).unwrap();
            (0..1200 * 1200).map(|i| tile.mask(i)).collect::<Vec<u8>>()
        };
        assert_eq!(snapshot(1), snapshot(4));
    }

    #[test]
    fn test_flat_tile_is_all_visible_nearby() {
        let map = ElevationMap::new(Resolution::Standard, Pages::new(1).unwrap());
        map.load_cell(CELL, &MemoryLoader::new()).unwrap();
        let tx = Site::new(44.5, 71.5, 200.0);
        let sweep = Sweep::new(PathProfiler::new(&map), &SweepConfig::default()).unwrap();
        sweep.plot_los_map(&tx, 30.0, 0).unwrap();
        // Radio horizon of 200 ft + 30 ft antennas is about 25 miles,
        // so the whole tile is not reached but the neighborhood is.
        assert_eq!(map.get_mask(44.55, 71.45), 1);
        assert_eq!(map.get_mask(44.45, 71.55), 1);
        assert_eq!(map.get_mask(44.999, 71.001), 0);
    }
}
