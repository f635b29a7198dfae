//! Walking a great circle from a site along a fixed bearing.

use crate::constants::EARTH_RADIUS_MILES;
use geo::geometry::Coord;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Returns the point `miles` away from (`lat`, `lon`) along
/// `azimuth`.
///
/// Inputs are degrees with west-positive longitude. The returned
/// coord has `x` = west-positive longitude in `0..=360` and `y` =
/// latitude.
pub fn destination(lat: f64, lon: f64, azimuth: f64, miles: f64) -> Coord<f64> {
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let azimuth = azimuth.to_radians();
    let beta = miles / EARTH_RADIUS_MILES;

    let lat2 = (lat1.sin() * beta.cos() + azimuth.cos() * beta.sin() * lat1.cos()).asin();
    let num = beta.cos() - lat1.sin() * lat2.sin();
    let den = lat1.cos() * lat2.cos();

    let mut lon2 = if azimuth == 0.0 && beta > FRAC_PI_2 - lat1 {
        lon1 + PI
    } else if azimuth == FRAC_PI_2 && beta > FRAC_PI_2 + lat1 {
        lon1 + PI
    } else if (num / den).abs() > 1.0 {
        lon1
    } else {
        let delta = if den > 0.0 { (num / den).acos() } else { 0.0 };
        // Eastward bearings shrink a west-positive longitude.
        if PI - azimuth >= 0.0 {
            lon1 - delta
        } else {
            lon1 + delta
        }
    };

    while lon2 < 0.0 {
        lon2 += TAU;
    }
    while lon2 > TAU {
        lon2 -= TAU;
    }

    Coord {
        x: lon2.to_degrees(),
        y: lat2.to_degrees(),
    }
}

/// Evenly spaced samples along a great circle.
///
/// Yields `(location, miles from the start)` every
/// `miles_per_sample` up to and including `total_miles`, but never
/// more than `limit` samples.
pub struct GreatCircleIter {
    lat: f64,
    lon: f64,
    azimuth: f64,
    miles_per_sample: f64,
    total_miles: f64,
    current: usize,
    limit: usize,
}

impl GreatCircleIter {
    pub fn new(
        (lat, lon): (f64, f64),
        azimuth: f64,
        miles_per_sample: f64,
        total_miles: f64,
        limit: usize,
    ) -> Self {
        Self {
            lat,
            lon,
            azimuth,
            miles_per_sample,
            total_miles,
            current: 0,
            limit,
        }
    }
}

impl Iterator for GreatCircleIter {
    type Item = (Coord<f64>, f64);

    fn next(&mut self) -> Option<Self::Item> {
        #[allow(clippy::cast_precision_loss)]
        let miles = self.miles_per_sample * self.current as f64;
        if self.total_miles == 0.0 || miles > self.total_miles || self.current >= self.limit {
            return None;
        }
        self.current += 1;
        Some((destination(self.lat, self.lon, self.azimuth, miles), miles))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.limit.saturating_sub(self.current)))
    }
}

#[cfg(test)]
mod tests {
    use super::{destination, GreatCircleIter};
    use crate::Site;
    use approx::assert_abs_diff_eq;
    use geo::geometry::Coord;

    #[test]
    fn test_destination_round_trip() {
        let start = Site::from_east(44.2705, -71.30325, 0.0);
        for azimuth in [10.0, 95.0, 180.0, 263.0, 341.0] {
            let Coord { x, y } = destination(start.lat(), start.lon(), azimuth, 25.0);
            let end = Site::new(y, x, 0.0);
            assert_abs_diff_eq!(start.distance(&end), 25.0, epsilon = 1e-6);
            assert_abs_diff_eq!(start.azimuth(&end), azimuth, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_iter_stops_at_total() {
        let samples: Vec<_> = GreatCircleIter::new((40.0, 100.0), 45.0, 0.5, 2.0, 100).collect();
        assert_eq!(samples.len(), 5);
        assert_abs_diff_eq!(samples[0].0.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(samples[0].0.y, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(samples[4].1, 2.0);
    }

    #[test]
    fn test_iter_honors_limit() {
        assert_eq!(GreatCircleIter::new((40.0, 100.0), 45.0, 0.5, 2.0, 3).count(), 3);
        assert_eq!(GreatCircleIter::new((40.0, 100.0), 45.0, 0.0, 0.0, 3).count(), 0);
    }
}
