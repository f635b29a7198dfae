//! Elevation tile store.

use crate::{Site, SignalMerge, TerrainError, Tile, TileLoader};
use dashmap::{mapref::one::Ref, DashMap};
use geo::geometry::Coord;
use log::{debug, warn};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, PoisonError, RwLock,
};

/// Terrain sample density.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// 3 arcseconds, 1200 points per degree.
    #[default]
    Standard,
    /// 1 arcsecond, 3600 points per degree.
    High,
}

impl Resolution {
    /// Points per degree.
    pub fn ppd(self) -> usize {
        match self {
            Self::Standard => 1200,
            Self::High => 3600,
        }
    }

    /// Path samples per radian of arc.
    pub fn samples_per_radian(self) -> f64 {
        match self {
            Self::Standard => 68_755.0,
            Self::High => 206_265.0,
        }
    }
}

/// Maximum number of one degree tiles held at once.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pages(usize);

impl Pages {
    pub fn new(pages: usize) -> Result<Self, TerrainError> {
        match pages {
            1 | 4 | 9 | 16 | 25 | 36 | 49 | 64 => Ok(Self(pages)),
            other => Err(TerrainError::InvalidPages(other)),
        }
    }

    pub fn count(self) -> usize {
        self.0
    }

    /// Widest analysis radius, in degrees, this budget can hold.
    pub fn degree_limit(self) -> f64 {
        match self.0 {
            1 => 0.125,
            4 => 0.5,
            9 => 1.0,
            16 => 1.5,
            25 => 2.0,
            36 => 2.5,
            49 => 3.0,
            _ => 3.5,
        }
    }

    /// Longest path profile, in samples, this budget can hold.
    pub fn max_path_samples(self, resolution: Resolution) -> usize {
        let hd = resolution == Resolution::High;
        match (self.0, hd) {
            (1, _) => 5092,
            (4, false) => 4950,
            (4, true) => 14_844,
            (9, false) => 10_870,
            (9, true) => 32_600,
            (16, false) => 19_240,
            (16, true) => 57_713,
            (25, false) => 30_025,
            (25, true) => 90_072,
            (36, false) => 43_217,
            (36, true) => 129_650,
            (49, false) => 58_813,
            (49, true) => 176_437,
            (_, false) => 76_810,
            (_, true) => 230_430,
        }
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self(16)
    }
}

/// Union of the loaded tiles' bounding boxes and elevation range.
///
/// Longitudes are west-positive whole degrees; `max_west` may be 360
/// for a tile touching the prime meridian.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub min_north: i32,
    pub max_north: i32,
    pub min_west: i32,
    pub max_west: i32,
    pub min_elevation: i32,
    pub max_elevation: i32,
}

impl Extent {
    fn empty() -> Self {
        Self {
            min_north: 90,
            max_north: -90,
            min_west: 360,
            max_west: -1,
            min_elevation: 32768,
            max_elevation: -32768,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_west == -1
    }

    fn include(&mut self, tile: &Tile) {
        self.max_north = self.max_north.max(tile.max_north());
        self.min_north = self.min_north.min(tile.min_north());

        // East/west comparisons flip when the box straddles the
        // 0/360 seam.
        let max_west = tile.max_west();
        if self.max_west == -1
            || ((max_west - self.max_west).abs() < 180) == (max_west > self.max_west)
        {
            self.max_west = max_west;
        }
        let min_west = tile.min_west();
        if self.min_west == 360
            || ((min_west - self.min_west).abs() < 180) == (min_west < self.min_west)
        {
            self.min_west = min_west;
        }

        self.min_elevation = self.min_elevation.min(i32::from(tile.min_elevation()));
        self.max_elevation = self.max_elevation.max(i32::from(tile.max_elevation()));
    }
}

/// Tiles loaded for one run, plus their signal and mask grids.
///
/// Tiles are never evicted; memory is bounded by the page budget.
pub struct ElevationMap {
    resolution: Resolution,

    pages: Pages,

    /// Tiles keyed by (minimum west, minimum north).
    tiles: DashMap<Coord<i32>, Arc<Tile>>,

    /// Pages reserved so far, including loads in flight.
    used: AtomicUsize,

    extent: RwLock<Extent>,
}

impl ElevationMap {
    pub fn new(resolution: Resolution, pages: Pages) -> Self {
        Self {
            resolution,
            pages,
            tiles: DashMap::new(),
            used: AtomicUsize::new(0),
            extent: RwLock::new(Extent::empty()),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn ppd(&self) -> usize {
        self.resolution.ppd()
    }

    pub fn pages(&self) -> Pages {
        self.pages
    }

    /// Returns the union box and elevation range of loaded tiles.
    pub fn extent(&self) -> Extent {
        *self.extent.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Returns every loaded tile, sorted by cell.
    pub fn tiles(&self) -> Vec<Arc<Tile>> {
        let mut tiles: Vec<Arc<Tile>> = self.tiles.iter().map(|r| Arc::clone(r.value())).collect();
        tiles.sort_by_key(|tile| (tile.min_north(), tile.min_west()));
        tiles
    }

    pub fn tile(&self, cell: Coord<i32>) -> Option<Arc<Tile>> {
        self.tiles.get(&cell).map(|r| Arc::clone(r.value()))
    }

    /// Loads every cell intersecting the box from `min_lat` to
    /// `max_lat` and `min_lon` to `max_lon` (west-positive whole
    /// degrees, as cell corners).
    ///
    /// # Errors
    ///
    /// Fails when the page budget is exhausted or the loader fails.
    /// Cells the loader has no data for become sea level.
    pub fn load_region(
        &self,
        max_lon: i32,
        min_lon: i32,
        max_lat: i32,
        min_lat: i32,
        loader: &dyn TileLoader,
    ) -> Result<(), TerrainError> {
        let width = {
            let d = (max_lon - min_lon).rem_euclid(360);
            d.min(360 - d)
        };
        let start = if max_lon - min_lon <= 180 { min_lon } else { max_lon };
        for w in 0..=width {
            for lat in min_lat.max(-90)..=max_lat.min(89) {
                self.load_cell(
                    Coord {
                        x: start + w,
                        y: lat,
                    },
                    loader,
                )?;
            }
        }
        debug!("loaded region; tiles: {}, extent: {:?}", self.tile_count(), self.extent());
        Ok(())
    }

    /// Returns the tile for `cell`, loading it on first use.
    ///
    /// # Errors
    ///
    /// See [`ElevationMap::load_region`].
    pub fn load_cell(&self, cell: Coord<i32>, loader: &dyn TileLoader) -> Result<Arc<Tile>, TerrainError> {
        let cell = Coord {
            x: cell.x.rem_euclid(360),
            y: cell.y,
        };
        let ppd = self.ppd();
        self.tiles
            .entry(cell)
            .or_try_insert_with(|| {
                self.reserve_page()?;
                let tile = match loader.load(cell, ppd) {
                    Ok(Some(tile)) if tile.ppd() == ppd => tile,
                    Ok(Some(tile)) => {
                        self.used.fetch_sub(1, Ordering::SeqCst);
                        return Err(TerrainError::Resolution {
                            cell,
                            expected: ppd,
                            found: tile.ppd(),
                        });
                    }
                    Ok(None) => {
                        warn!("no terrain for {cell:?}, assuming sea level");
                        Tile::flat(cell, ppd)
                    }
                    Err(e) => {
                        self.used.fetch_sub(1, Ordering::SeqCst);
                        return Err(e);
                    }
                };
                self.extent
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .include(&tile);
                Ok(Arc::new(tile))
            })
            .map(|r| Arc::clone(r.value()))
    }

    fn reserve_page(&self) -> Result<(), TerrainError> {
        let budget = self.pages.count();
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < budget).then_some(used + 1)
            })
            .map(|_| ())
            .map_err(|_| TerrainError::PageBudget(budget))
    }

    /// Finds the tile and grid position holding `lat`, `lon`.
    ///
    /// Every grid lookup goes through here.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn locate(&self, lat: f64, lon: f64) -> Option<(Ref<'_, Coord<i32>, Arc<Tile>>, usize)> {
        let half = 0.5 / self.ppd() as f64;
        let north = (lat + half).floor();
        let west = (lon - half).ceil() - 1.0;
        if !north.is_finite() || !west.is_finite() {
            return None;
        }
        let (north, west) = (north as i32, west as i32);
        // Rounding at a tile edge can land on a neighbor.
        let cells = [(0, 0), (0, -1), (0, 1), (-1, 0), (1, 0)].map(|(dn, dw)| Coord {
            x: (west + dw).rem_euclid(360),
            y: north + dn,
        });
        let lookup = |find: fn(&Tile, f64, f64) -> Option<usize>| {
            cells.iter().find_map(|cell| {
                let tile = self.tiles.get(cell)?;
                let index = find(&**tile, lat, lon)?;
                Some((tile, index))
            })
        };
        // The neighbor owns its first sample. When it is not loaded the
        // tile whose bounds hold the point takes it.
        lookup(Tile::index).or_else(|| lookup(Tile::index_within))
    }

    /// Returns the tile and grid `(x, y)` holding `lat`, `lon`.
    pub fn find_dem(&self, lat: f64, lon: f64) -> Option<(Arc<Tile>, usize, usize)> {
        self.locate(lat, lon).map(|(tile, index)| {
            let ppd = tile.ppd();
            (Arc::clone(tile.value()), index / ppd, index % ppd)
        })
    }

    /// Returns the cell and linear grid index holding `lat`, `lon`.
    pub fn pixel(&self, lat: f64, lon: f64) -> Option<(Coord<i32>, usize)> {
        self.locate(lat, lon).map(|(tile, index)| (*tile.key(), index))
    }

    /// Returns the elevation in meters, if `lat`, `lon` is loaded.
    pub fn elevation(&self, lat: f64, lon: f64) -> Option<f64> {
        self.locate(lat, lon)
            .map(|(tile, index)| f64::from(tile.elevation(index)))
    }

    /// Returns the ground elevation under `site` in meters, or 0
    /// outside the loaded tiles.
    pub fn get_elevation(&self, site: &Site) -> f64 {
        self.elevation(site.lat(), site.lon()).unwrap_or(0.0)
    }

    /// Returns `site` with its height above the ground under it.
    pub fn agl(&self, site: &Site) -> Site {
        site.to_agl(self.get_elevation(site))
    }

    /// Returns the height of `site`'s antenna above sea level in
    /// meters.
    pub fn antenna_m(&self, site: &Site) -> f64 {
        let ground = self.get_elevation(site);
        ground + site.to_agl(ground).alt_m()
    }

    /// Returns `false` if `lat`, `lon` is not loaded.
    pub fn put_signal(&self, lat: f64, lon: f64, signal: u8) -> bool {
        self.locate(lat, lon)
            .map(|(tile, index)| tile.set_signal(index, signal))
            .is_some()
    }

    pub fn get_signal(&self, lat: f64, lon: f64) -> u8 {
        self.locate(lat, lon)
            .map_or(0, |(tile, index)| tile.signal(index))
    }

    /// Atomically folds `signal` into the grid, returning the stored
    /// value.
    pub fn merge_signal(&self, lat: f64, lon: f64, signal: u8, merge: SignalMerge) -> Option<u8> {
        self.locate(lat, lon)
            .map(|(tile, index)| tile.merge_signal(index, signal, merge))
    }

    /// Returns `false` if `lat`, `lon` is not loaded.
    pub fn put_mask(&self, lat: f64, lon: f64, mask: u8) -> bool {
        self.locate(lat, lon)
            .map(|(tile, index)| tile.set_mask(index, mask))
            .is_some()
    }

    /// ORs `bits` into the mask, returning the new mask.
    pub fn or_mask(&self, lat: f64, lon: f64, bits: u8) -> Option<u8> {
        self.locate(lat, lon)
            .map(|(tile, index)| tile.or_mask(index, bits))
    }

    pub fn get_mask(&self, lat: f64, lon: f64) -> u8 {
        self.locate(lat, lon).map_or(0, |(tile, index)| tile.mask(index))
    }

    /// Atomically replaces the mask with `f(mask)`, returning the new
    /// mask.
    pub fn update_mask<F>(&self, lat: f64, lon: f64, f: F) -> Option<u8>
    where
        F: Fn(u8) -> u8,
    {
        self.locate(lat, lon)
            .map(|(tile, index)| tile.update_mask(index, f))
    }
}

#[cfg(test)]
mod tests {
    use super::{ElevationMap, Extent, Pages, Resolution};
    use crate::{MemoryLoader, SignalMerge, Site, TerrainError};
    use geo::geometry::Coord;

    fn map(pages: usize) -> ElevationMap {
        ElevationMap::new(Resolution::Standard, Pages::new(pages).unwrap())
    }

    fn hills() -> MemoryLoader {
        MemoryLoader::new()
            .with_flat(Coord { x: 71, y: 44 }, 300)
            .with_flat(Coord { x: 72, y: 44 }, 500)
            .with_flat(Coord { x: 71, y: 45 }, 700)
    }

    #[test]
    fn test_invalid_pages() {
        assert!(matches!(Pages::new(3), Err(TerrainError::InvalidPages(3))));
        assert_eq!(Pages::new(9).unwrap().degree_limit(), 1.0);
        assert_eq!(Pages::new(4).unwrap().max_path_samples(Resolution::High), 14_844);
    }

    #[test]
    fn test_page_budget_exhausted() {
        let map = map(1);
        let loader = hills();
        map.load_cell(Coord { x: 71, y: 44 }, &loader).unwrap();
        // Already loaded; costs nothing.
        map.load_cell(Coord { x: 71, y: 44 }, &loader).unwrap();
        assert!(matches!(
            map.load_cell(Coord { x: 72, y: 44 }, &loader),
            Err(TerrainError::PageBudget(1))
        ));
        assert_eq!(map.tile_count(), 1);
    }

    #[test]
    fn test_missing_tile_reads_sea_level() {
        let map = map(4);
        map.load_region(71, 70, 44, 44, &hills()).unwrap();
        let missing = Site::new(44.5, 70.5, 0.0);
        assert_eq!(map.elevation(missing.lat(), missing.lon()), Some(0.0));
        assert_eq!(map.get_elevation(&Site::new(44.5, 71.5, 0.0)), 300.0);
        // Outside every loaded tile.
        assert_eq!(map.elevation(10.0, 10.0), None);
        assert_eq!(map.get_elevation(&Site::new(10.0, 10.0, 0.0)), 0.0);
    }

    #[test]
    fn test_extent_is_union() {
        let map = map(4);
        assert!(map.extent().is_empty());
        map.load_region(72, 71, 45, 44, &hills()).unwrap();
        assert_eq!(map.tile_count(), 4);
        assert_eq!(
            map.extent(),
            Extent {
                min_north: 44,
                max_north: 46,
                min_west: 71,
                max_west: 73,
                min_elevation: 0,
                max_elevation: 700,
            }
        );
        let cells: Vec<_> = map.tiles().iter().map(|t| t.cell()).collect();
        assert_eq!(cells[0], Coord { x: 71, y: 44 });
    }

    #[test]
    fn test_extent_across_prime_meridian() {
        let map = map(4);
        map.load_region(0, 359, 51, 51, &MemoryLoader::new()).unwrap();
        let extent = map.extent();
        assert_eq!((extent.min_west, extent.max_west), (359, 1));
        assert_eq!(map.elevation(51.5, 0.5), Some(0.0));
        assert_eq!(map.elevation(51.5, 359.5), Some(0.0));
    }

    #[test]
    fn test_tile_edges_resolve_once() {
        let map = map(4);
        map.load_region(72, 71, 45, 44, &hills()).unwrap();
        // Exactly on the shared edge the northern tile owns the sample.
        assert_eq!(map.elevation(45.0, 71.5), Some(700.0));
        assert_eq!(map.elevation(45.0 - 1.0 / 1200.0, 71.5), Some(300.0));
        // Exactly on the western edge of 71 the sample belongs to 71.
        assert_eq!(map.elevation(44.5, 72.0), Some(300.0));
        assert_eq!(map.elevation(44.5, 72.0 + 1.0 / 1200.0), Some(500.0));
        let (tile, x, y) = map.find_dem(44.5, 71.5).unwrap();
        assert_eq!(tile.cell(), Coord { x: 71, y: 44 });
        assert_eq!((x, y), (600, 599));
        assert_eq!(map.pixel(44.5, 71.5), Some((Coord { x: 71, y: 44 }, 600 * 1200 + 599)));
        assert_eq!(map.pixel(10.0, 10.0), None);
    }

    #[test]
    fn test_unloaded_neighbor_edge_clamps() {
        let map = map(1);
        map.load_cell(Coord { x: 71, y: 44 }, &hills()).unwrap();
        let cell = Coord { x: 71, y: 44 };
        // North edge: last row of the tile.
        assert_eq!(map.pixel(45.0, 71.5), Some((cell, 1199 * 1200 + 599)));
        assert_eq!(map.pixel(45.0 - 1e-9, 71.5), Some((cell, 1199 * 1200 + 599)));
        // East edge: first column of the tile.
        assert_eq!(map.pixel(44.5, 71.0), Some((cell, 600 * 1200)));
        assert_eq!(map.pixel(44.5, 71.000_000_001), Some((cell, 600 * 1200)));
        assert_eq!(map.elevation(45.0, 71.0), Some(300.0));
        // Just outside the bounds is still unloaded.
        assert_eq!(map.pixel(45.0 + 1e-6, 71.5), None);
        assert_eq!(map.pixel(44.5, 71.0 - 1e-6), None);
    }

    #[test]
    fn test_signal_round_trip() {
        let map = map(1);
        map.load_cell(Coord { x: 71, y: 44 }, &hills()).unwrap();
        // Every point inside the tile's bounds, edges included.
        let mut steps: Vec<f64> = (0..=500).map(|i| f64::from(i) / 500.0).collect();
        steps.extend([1e-9, 1.0 - 1e-9, 0.5 / 1200.0, 1.0 - 0.5 / 1200.0]);
        for (i, dlat) in steps.iter().enumerate() {
            for (j, dlon) in steps.iter().enumerate() {
                let (lat, lon) = (44.0 + dlat, 71.0 + dlon);
                #[allow(clippy::cast_possible_truncation)]
                let signal = ((i * 7 + j) % 255 + 1) as u8;
                assert!(map.put_signal(lat, lon, signal), "lat={lat} lon={lon}");
                assert_eq!(map.get_signal(lat, lon), signal, "lat={lat} lon={lon}");
            }
        }

        assert!(map.put_signal(44.25, 71.25, 142));
        assert_eq!(map.get_signal(44.25, 71.25), 142);
        assert_eq!(map.merge_signal(44.25, 71.25, 100, SignalMerge::MaxHold), Some(142));
        assert_eq!(map.merge_signal(44.25, 71.25, 150, SignalMerge::MaxHold), Some(150));
        // Writes outside the map are no-ops.
        assert!(!map.put_signal(10.0, 10.0, 1));
        assert_eq!(map.get_signal(10.0, 10.0), 0);
        assert_eq!(map.merge_signal(10.0, 10.0, 1, SignalMerge::MaxHold), None);
    }

    #[test]
    fn test_or_mask_accumulates() {
        let map = map(1);
        map.load_cell(Coord { x: 71, y: 44 }, &hills()).unwrap();
        assert_eq!(map.or_mask(44.25, 71.25, 1), Some(1));
        assert_eq!(map.or_mask(44.25, 71.25, 8), Some(9));
        assert_eq!(map.or_mask(44.25, 71.25, 8), Some(9));
        assert_eq!(map.get_mask(44.25, 71.25), 9);
        assert!(map.put_mask(44.25, 71.25, 2));
        assert_eq!(map.update_mask(44.25, 71.25, |m| (m & 7) | (1 << 3)), Some(10));
        assert_eq!(map.or_mask(10.0, 10.0, 1), None);
    }

    #[test]
    fn test_concurrent_loads_share_one_page() {
        let map = map(1);
        let loader = hills();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| map.load_cell(Coord { x: 71, y: 44 }, &loader).unwrap());
            }
        });
        assert_eq!(map.tile_count(), 1);
        map.load_cell(Coord { x: 71, y: 44 }, &loader).unwrap();
    }
}
