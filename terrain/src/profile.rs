use crate::{
    constants::{MEAN_EARTH_RADIUS, METERS_PER_MILE},
    math::{cos_angle, destination, elevation_angle, GreatCircleIter},
    ElevationMap, Site, TerrainError,
};
use geo::geometry::Coord;
use log::debug;
use std::{fmt, time::Instant};

/// Terrain sampled along the great circle from one site to another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    /// Sample locations, `x` west-positive longitude and `y` latitude.
    coords: Vec<Coord<f64>>,

    /// Ground elevation at each sample (meters).
    elevation: Vec<f64>,

    /// Distance of each sample from the source (miles).
    distance: Vec<f64>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[Coord<f64>] {
        &self.coords
    }

    pub fn elevation(&self) -> &[f64] {
        &self.elevation
    }

    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Distance from the source to the last sample (miles).
    pub fn total_miles(&self) -> f64 {
        self.distance.last().copied().unwrap_or(0.0)
    }

    /// Packs the whole path into the profile layout the propagation
    /// engine reads: interval count, spacing in meters, then
    /// elevations.
    ///
    /// `clutter_m` is added to every inner sample above sea level.
    #[allow(clippy::cast_precision_loss)]
    pub fn pfl(&self, clutter_m: f64) -> Vec<f64> {
        let len = self.len();
        let mut pfl = Vec::with_capacity(len + 2);
        pfl.push(len.saturating_sub(1) as f64);
        pfl.push(match len {
            0 | 1 => 0.0,
            _ => METERS_PER_MILE * (self.distance[1] - self.distance[0]),
        });
        pfl.extend(self.elevation.iter().enumerate().map(|(i, &z)| {
            if i == 0 || i + 1 == len || z == 0.0 {
                z
            } else {
                z + clutter_m
            }
        }));
        pfl
    }
}

/// Extracts terrain profiles from an [`ElevationMap`].
///
/// Built once per run and shared by reference.
#[derive(Clone, Copy)]
pub struct PathProfiler<'a> {
    map: &'a ElevationMap,

    /// Ground clutter height added to inner samples (meters).
    clutter_m: f64,

    /// Multiplier applied to the mean earth radius.
    earth_radius_multiplier: f64,

    /// Longest profile, in samples.
    max_samples: usize,
}

impl fmt::Debug for PathProfiler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathProfiler")
            .field("resolution", &self.map.resolution())
            .field("clutter_m", &self.clutter_m)
            .field("earth_radius_multiplier", &self.earth_radius_multiplier)
            .field("max_samples", &self.max_samples)
            .finish_non_exhaustive()
    }
}

impl<'a> PathProfiler<'a> {
    pub fn new(map: &'a ElevationMap) -> Self {
        Self {
            map,
            clutter_m: 0.0,
            earth_radius_multiplier: 1.0,
            max_samples: map.pages().max_path_samples(map.resolution()),
        }
    }

    pub fn clutter(mut self, meters: f64) -> Self {
        self.clutter_m = meters;
        self
    }

    pub fn earth_radius_multiplier(mut self, multiplier: f64) -> Self {
        self.earth_radius_multiplier = multiplier;
        self
    }

    pub fn max_samples(mut self, samples: usize) -> Self {
        self.max_samples = samples.max(1);
        self
    }

    pub fn map(&self) -> &'a ElevationMap {
        self.map
    }

    pub fn clutter_m(&self) -> f64 {
        self.clutter_m
    }

    /// Effective earth radius (meters).
    pub fn earth_radius_m(&self) -> f64 {
        MEAN_EARTH_RADIUS * self.earth_radius_multiplier
    }

    /// Returns the terrain from `source` to `destination`.
    ///
    /// Samples are spaced by the map's resolution and the exact
    /// destination is always the last one. Endpoints closer together
    /// than a few samples produce a single sample at `destination`.
    pub fn read_path(&self, source: &Site, destination: &Site) -> Path {
        let now = Instant::now();

        let azimuth = source.azimuth(destination);
        let mut total_miles = source.distance(destination);
        #[allow(clippy::cast_precision_loss)]
        let ppd = self.map.ppd() as f64;
        let miles_per_sample = if total_miles > 30.0 / ppd {
            let spr = self.map.resolution().samples_per_radian();
            let dx = spr * (source.lon() - destination.lon()).to_radians().cos().acos();
            let dy = spr * (source.lat() - destination.lat()).to_radians().cos().acos();
            total_miles / dx.hypot(dy)
        } else {
            total_miles = 0.0;
            0.0
        };

        let capacity = self.max_samples.min(4096);
        let mut path = Path {
            coords: Vec::with_capacity(capacity),
            elevation: Vec::with_capacity(capacity),
            distance: Vec::with_capacity(capacity),
        };
        let samples = GreatCircleIter::new(
            (source.lat(), source.lon()),
            azimuth,
            miles_per_sample,
            total_miles,
            self.max_samples,
        );
        for (coord, miles) in samples {
            path.push(self.map, coord, miles);
        }
        if path.len() < self.max_samples {
            let end = Coord {
                x: destination.lon(),
                y: destination.lat(),
            };
            path.push(self.map, end, total_miles);
        } else {
            path.truncate(self.max_samples - 1);
        }

        debug!(
            "path; len: {}, miles: {:.3}, exec: {:?}",
            path.len(),
            total_miles,
            now.elapsed()
        );
        path
    }

    /// Returns the mean ground elevation (meters) from `start_miles`
    /// to `end_miles` out along `azimuth`, or `None` if that stretch
    /// is all sea level.
    ///
    /// Clutter is added to every sample above sea level.
    ///
    /// # Errors
    ///
    /// Fails if the end of the stretch falls outside the loaded tiles.
    pub fn average_terrain(
        &self,
        source: &Site,
        azimuth: f64,
        start_miles: f64,
        end_miles: f64,
    ) -> Result<Option<f64>, TerrainError> {
        let Coord { x: lon, y: lat } = destination(source.lat(), source.lon(), azimuth, end_miles);
        if self.map.elevation(lat, lon).is_none() {
            return Err(TerrainError::NoTerrain { lat, lon });
        }
        let path = self.read_path(source, &source.moved(lat, lon));

        // Trailing sea level is not part of the average.
        let end = path
            .elevation
            .iter()
            .rposition(|&z| z != 0.0)
            .map_or(0, |i| i + 1);
        let (sum, count) = path.elevation[..end]
            .iter()
            .zip(&path.distance)
            .filter(|(_, &d)| d >= start_miles)
            .fold((0.0, 0_u32), |(sum, count), (&z, _)| {
                let z = if z == 0.0 { z } else { z + self.clutter_m };
                (sum + z, count + 1)
            });
        Ok((count > 0).then(|| sum / f64::from(count)))
    }

    /// Returns `source`'s antenna height above average terrain.
    ///
    /// # Errors
    ///
    /// Fails if any radial reaches past the loaded tiles.
    pub fn haat(&self, source: &Site) -> Result<Haat, TerrainError> {
        let antenna_m = self.map.antenna_m(source);
        let mut radials = [None; 8];
        for (i, radial) in radials.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let azimuth = 45.0 * i as f64;
            *radial = self
                .average_terrain(source, azimuth, 2.0, 10.0)?
                .map(|terrain| antenna_m - terrain);
        }
        let land: Vec<f64> = radials.iter().flatten().copied().collect();
        #[allow(clippy::cast_precision_loss)]
        let average = (!land.is_empty()).then(|| land.iter().sum::<f64>() / land.len() as f64);
        Ok(Haat { radials, average })
    }

    /// Returns the angle (degrees) above the horizon at which
    /// `source` sees `destination`.
    pub fn elevation_angle(&self, source: &Site, destination: &Site) -> f64 {
        let src_m = self.map.antenna_m(source);
        let dst_m = self.map.antenna_m(destination);
        let distance_m = METERS_PER_MILE * source.distance(destination);
        elevation_angle(src_m, distance_m, dst_m, self.earth_radius_m()).to_degrees()
    }

    /// Returns the angle (degrees) above the horizon at which
    /// `source` sees the first terrain obstructing `destination`, or
    /// `destination` itself when the path is clear.
    pub fn elevation_angle2(&self, source: &Site, destination: &Site) -> Obstruction {
        let path = self.read_path(source, destination);
        let er = self.earth_radius_m();
        let source_r = er + self.map.antenna_m(source);
        let dest_r = er + self.map.antenna_m(destination);
        let distance_m = METERS_PER_MILE * source.distance(destination);
        let cos_xmtr = cos_angle(source_r, distance_m, dest_r);

        let to_degrees = |cos: f64| cos.clamp(-1.0, 1.0).acos().to_degrees() - 90.0;
        for x in 2..path.len().saturating_sub(1) {
            let z = path.elevation[x];
            let test_r = er + if z == 0.0 { z } else { z + self.clutter_m };
            let cos_test = cos_angle(source_r, METERS_PER_MILE * path.distance[x], test_r);
            if cos_xmtr >= cos_test {
                return Obstruction {
                    angle: to_degrees(cos_test),
                    at: Some(path.coords[x]),
                };
            }
        }
        Obstruction {
            angle: to_degrees(cos_xmtr),
            at: None,
        }
    }
}

impl Path {
    fn push(&mut self, map: &ElevationMap, coord: Coord<f64>, miles: f64) {
        self.elevation
            .push(map.elevation(coord.y, coord.x).unwrap_or(0.0));
        self.coords.push(coord);
        self.distance.push(miles);
    }

    fn truncate(&mut self, len: usize) {
        self.coords.truncate(len);
        self.elevation.truncate(len);
        self.distance.truncate(len);
    }
}

/// Antenna height above average terrain (meters).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Haat {
    /// One value per 45° radial, clockwise from north; `None` where
    /// the radial is all sea level.
    pub radials: [Option<f64>; 8],

    /// Mean over the radials that cross land.
    pub average: Option<f64>,
}

/// Result of [`PathProfiler::elevation_angle2`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstruction {
    /// Elevation angle (degrees).
    pub angle: f64,

    /// Location of the first obstruction, if any.
    pub at: Option<Coord<f64>>,
}

#[cfg(test)]
mod tests {
    use super::PathProfiler;
    use crate::{ElevationMap, MemoryLoader, Pages, Resolution, Site, TerrainError};
    use approx::assert_relative_eq;
    use geo::geometry::Coord;

    const CELL: Coord<i32> = Coord { x: 71, y: 44 };

    fn map_with(loader: &MemoryLoader) -> ElevationMap {
        let map = ElevationMap::new(Resolution::Standard, Pages::new(4).unwrap());
        map.load_region(71, 71, 44, 44, loader).unwrap();
        map
    }

    #[test]
    fn test_read_path_along_meridian() {
        let map = map_with(&MemoryLoader::new().with_cell(CELL, |lat, _| if lat < 44.5 { 10 } else { 100 }));
        let profiler = PathProfiler::new(&map);
        let (src, dst) = (Site::new(44.3, 71.5, 30.0), Site::new(44.7, 71.5, 30.0));
        let path = profiler.read_path(&src, &dst);

        // 0.4° of latitude at 1200 points per degree.
        assert!((475..=485).contains(&path.len()), "{}", path.len());
        assert_eq!(path.distance()[0], 0.0);
        assert!(path.distance().windows(2).all(|w| w[0] < w[1]));
        assert_relative_eq!(path.total_miles(), src.distance(&dst));
        let last = path.coords()[path.len() - 1];
        assert_eq!((last.y, last.x), (dst.lat(), dst.lon()));
        assert_eq!(path.elevation()[0], 10.0);
        assert_eq!(path.elevation()[path.len() - 1], 100.0);
    }

    #[test]
    fn test_pfl_packing() {
        let map = map_with(&MemoryLoader::new().with_flat(CELL, 50));
        let profiler = PathProfiler::new(&map);
        let path = profiler.read_path(&Site::new(44.3, 71.5, 30.0), &Site::new(44.4, 71.5, 30.0));
        let pfl = path.pfl(5.0);
        #[allow(clippy::cast_precision_loss)]
        let intervals = (path.len() - 1) as f64;
        assert_eq!(pfl[0], intervals);
        assert_eq!(pfl.len(), path.len() + 2);
        assert_relative_eq!(pfl[1], 1609.344 * path.distance()[1], max_relative = 1e-12);
        // Clutter on inner samples only.
        assert_eq!(pfl[2], 50.0);
        assert_eq!(pfl[3], 55.0);
        assert_eq!(pfl[pfl.len() - 1], 50.0);
    }

    #[test]
    fn test_coincident_sites() {
        let map = map_with(&MemoryLoader::new().with_flat(CELL, 50));
        let site = Site::new(44.3, 71.5, 30.0);
        let path = PathProfiler::new(&map).read_path(&site, &site);
        assert_eq!(path.len(), 1);
        assert_eq!(path.total_miles(), 0.0);
        assert_eq!(path.pfl(0.0), vec![0.0, 0.0, 50.0]);
    }

    #[test]
    fn test_max_samples() {
        let map = map_with(&MemoryLoader::new().with_flat(CELL, 50));
        let path = PathProfiler::new(&map)
            .max_samples(50)
            .read_path(&Site::new(44.3, 71.5, 30.0), &Site::new(44.7, 71.5, 30.0));
        assert_eq!(path.len(), 49);
    }

    #[test]
    fn test_average_terrain_and_haat() {
        let map = map_with(&MemoryLoader::new().with_flat(CELL, 250));
        let profiler = PathProfiler::new(&map);
        let site = Site::new(44.5, 71.5, 100.0);
        assert_relative_eq!(profiler.average_terrain(&site, 90.0, 2.0, 10.0).unwrap().unwrap(), 250.0);

        let haat = profiler.haat(&site).unwrap();
        for radial in haat.radials {
            assert_relative_eq!(radial.unwrap(), 30.48, epsilon = 1e-9);
        }
        assert_relative_eq!(haat.average.unwrap(), 30.48, epsilon = 1e-9);

        // 100 miles east leaves the loaded tile.
        assert!(matches!(
            profiler.average_terrain(&site, 90.0, 2.0, 100.0),
            Err(TerrainError::NoTerrain { .. })
        ));
    }

    #[test]
    fn test_amsl_site_matches_agl_site() {
        let map = map_with(&MemoryLoader::new().with_flat(CELL, 250));
        let profiler = PathProfiler::new(&map);
        let agl = Site::new(44.5, 71.5, 100.0);
        let amsl = Site::new(44.5, 71.5, 100.0 + 250.0 / 0.3048).above_sea_level(true);
        let rx = Site::new(44.6, 71.5, 30.0);

        assert_relative_eq!(
            profiler.haat(&amsl).unwrap().average.unwrap(),
            profiler.haat(&agl).unwrap().average.unwrap(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            profiler.elevation_angle(&amsl, &rx),
            profiler.elevation_angle(&agl, &rx),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            profiler.elevation_angle2(&amsl, &rx).angle,
            profiler.elevation_angle2(&agl, &rx).angle,
            epsilon = 1e-9
        );
        assert!(format!("{profiler:?}").starts_with("PathProfiler"));
    }

    #[test]
    fn test_sea_has_no_average() {
        let map = map_with(&MemoryLoader::new().with_flat(CELL, 0));
        let profiler = PathProfiler::new(&map);
        let site = Site::new(44.5, 71.5, 100.0);
        assert_eq!(profiler.average_terrain(&site, 0.0, 2.0, 10.0).unwrap(), None);
        assert_eq!(profiler.haat(&site).unwrap().average, None);
    }

    #[test]
    fn test_obstruction_raises_elevation_angle() {
        let ridge = |lat: f64, _| if (44.50..44.52).contains(&lat) { 500 } else { 0 };
        let map = map_with(&MemoryLoader::new().with_cell(CELL, ridge));
        let profiler = PathProfiler::new(&map);
        // A tall receiver clears the earth's bulge but not the ridge.
        let (tx, rx) = (Site::new(44.3, 71.5, 30.0), Site::new(44.7, 71.5, 2000.0));

        let direct = profiler.elevation_angle(&tx, &rx);
        assert!((0.3..0.8).contains(&direct), "{direct}");
        let first = profiler.elevation_angle2(&tx, &rx);
        assert!(first.angle > direct + 0.3, "{first:?}");
        let at = first.at.unwrap();
        assert!((44.49..44.53).contains(&at.y), "{at:?}");

        // Nothing in the way looking the other direction.
        let clear = profiler.elevation_angle2(&tx, &Site::new(44.4, 71.5, 30.0));
        assert!(clear.at.is_none());
    }
}
