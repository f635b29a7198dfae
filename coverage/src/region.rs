//! Deciding which tiles a run needs.

use terrain::{
    constants::METERS_PER_FOOT, math::lon_diff, ElevationMap, Pages, Site, TerrainError,
    TileLoader,
};

/// Box of whole-degree cells, west-positive longitudes in `0..360`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub max_lon: i32,
    pub min_lon: i32,
    pub max_lat: i32,
    pub min_lat: i32,
}

impl Region {
    /// Returns the cells holding `sites`, or `None` for no sites.
    pub fn covering<'a, I>(sites: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Site>,
    {
        let mut sites = sites.into_iter();
        let first = sites.next()?;
        let (lat, lon) = cell_of(first.lat(), first.lon());
        let mut region = Self {
            max_lon: lon,
            min_lon: lon,
            max_lat: lat,
            min_lat: lat,
        };
        for site in sites {
            let (lat, lon) = cell_of(site.lat(), site.lon());
            region.include(lat, lat, lon, lon);
        }
        Some(region)
    }

    /// Grows the region to hold cells `south..=north` and
    /// `east..=west` (west-positive).
    pub fn include(&mut self, south: i32, north: i32, east: i32, west: i32) {
        self.min_lat = self.min_lat.min(south);
        self.max_lat = self.max_lat.max(north);
        if lon_diff(f64::from(east), f64::from(self.min_lon)) < 0.0 {
            self.min_lon = east;
        }
        if lon_diff(f64::from(west), f64::from(self.max_lon)) >= 0.0 {
            self.max_lon = west;
        }
    }

    /// Grows the region by `reach` around `tx`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn include_reach(&mut self, tx: &Site, reach: &Reach) {
        let north_min = (tx.lat() - reach.deg_range).floor() as i32;
        let north_max = (tx.lat() + reach.deg_range).floor() as i32;
        let west_min = ((tx.lon() - reach.deg_range_lon).floor() as i32).rem_euclid(360);
        let west_max = ((tx.lon() + reach.deg_range_lon).floor() as i32).rem_euclid(360);
        self.include(north_min, north_max, west_min, west_max);
    }

    /// Loads every cell in the region.
    ///
    /// # Errors
    ///
    /// See [`ElevationMap::load_region`].
    pub fn load(&self, map: &ElevationMap, loader: &dyn TileLoader) -> Result<(), TerrainError> {
        map.load_region(self.max_lon, self.min_lon, self.max_lat, self.min_lat, loader)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(lat: f64, lon: f64) -> (i32, i32) {
    (lat.floor() as i32, (lon.floor() as i32).rem_euclid(360))
}

/// Ball park radio horizon of a transmitter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reach {
    /// Transmitter's radio horizon (miles).
    pub tx_range: f64,
    /// Receiver's radio horizon (miles).
    pub rx_range: f64,
    /// Sweep radius (miles).
    pub max_range: f64,
    /// Latitude span to load (degrees).
    pub deg_range: f64,
    /// Longitude span to load (degrees).
    pub deg_range_lon: f64,
}

impl Reach {
    /// Estimates how far `tx` can see a receiver `rx_alt_ft` above
    /// ground, capped by what `pages` can hold.
    ///
    /// `max_range` overrides the estimated sweep radius. The tiles
    /// under `tx` must already be loaded.
    pub fn estimate(
        map: &ElevationMap,
        pages: Pages,
        tx: &Site,
        rx_alt_ft: f64,
        max_range: Option<f64>,
    ) -> Self {
        let ground_ft = map.get_elevation(tx) / METERS_PER_FOOT;
        let tx_range = (1.5 * (map.agl(tx).alt() + ground_ft)).max(0.0).sqrt();
        let rx_range = (1.5 * rx_alt_ft).max(0.0).sqrt();
        let max_range = max_range.unwrap_or(tx_range + rx_range);
        let deg_range = max_range / 57.0;
        let deg_range_lon = deg_range / tx.lat().abs().min(70.0).to_radians().cos();
        let limit = pages.degree_limit();
        Self {
            tx_range,
            rx_range,
            max_range,
            deg_range: deg_range.min(limit),
            deg_range_lon: deg_range_lon.min(limit),
        }
    }
}
