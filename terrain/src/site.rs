use crate::constants::{EARTH_RADIUS_MILES, METERS_PER_FOOT};
use std::f64::consts::{PI, TAU};

/// A transmitter, receiver or any other named location.
///
/// Longitude is stored west-positive in `0..360`, which is the
/// convention every tile and grid in this crate indexes by.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    lat: f64,
    lon: f64,
    alt: f64,
    amsl: bool,
    name: String,
}

impl Site {
    /// Returns a site at `lat` and west-positive `lon`, `alt` feet
    /// above ground.
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self {
            lat,
            lon: lon.rem_euclid(360.0),
            alt,
            amsl: false,
            name: String::new(),
        }
    }

    /// Returns a site from a conventional east-positive longitude.
    pub fn from_east(lat: f64, lon_east: f64, alt: f64) -> Self {
        Self::new(lat, -lon_east, alt)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks `alt` as feet above mean sea level instead of above
    /// ground.
    pub fn above_sea_level(mut self, amsl: bool) -> Self {
        self.amsl = amsl;
        self
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// West-positive longitude in degrees, `0..360`.
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// East-positive longitude in degrees, `-180..=180`.
    pub fn lon_east(&self) -> f64 {
        let lon = -self.lon;
        if lon < -180.0 {
            lon + 360.0
        } else {
            lon
        }
    }

    /// Antenna height in feet.
    pub fn alt(&self) -> f64 {
        self.alt
    }

    /// Antenna height in meters.
    pub fn alt_m(&self) -> f64 {
        self.alt * METERS_PER_FOOT
    }

    pub fn is_amsl(&self) -> bool {
        self.amsl
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns this site with its height converted to above ground,
    /// given the ground elevation in meters.
    pub fn to_agl(&self, ground_m: f64) -> Self {
        if self.amsl {
            Self {
                alt: self.alt - ground_m / METERS_PER_FOOT,
                amsl: false,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }

    /// Returns a copy of this site at another location, keeping its
    /// height.
    pub(crate) fn moved(&self, lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ..self.clone()
        }
    }

    /// Great-circle distance to `other` in miles.
    pub fn distance(&self, other: &Self) -> f64 {
        EARTH_RADIUS_MILES * self.arc(other)
    }

    /// True-north bearing to `other` in degrees, `0..360`.
    pub fn azimuth(&self, other: &Self) -> f64 {
        let (src_lat, src_lon) = (self.lat.to_radians(), self.lon.to_radians());
        let (dest_lat, dest_lon) = (other.lat.to_radians(), other.lon.to_radians());

        let beta = self.arc(other);
        if beta == 0.0 {
            return 0.0;
        }

        let num = dest_lat.sin() - src_lat.sin() * beta.cos();
        let den = src_lat.cos() * beta.sin();
        let mut azimuth = (num / den).clamp(-1.0, 1.0).acos();

        let mut diff = dest_lon - src_lon;
        if diff <= -PI {
            diff += TAU;
        }
        if diff >= PI {
            diff -= TAU;
        }
        // Longitude grows westward.
        if diff > 0.0 {
            azimuth = TAU - azimuth;
        }
        azimuth.to_degrees().rem_euclid(360.0)
    }

    /// Central angle to `other` in radians.
    fn arc(&self, other: &Self) -> f64 {
        let (lat1, lon1) = (self.lat.to_radians(), self.lon.to_radians());
        let (lat2, lon2) = (other.lat.to_radians(), other.lon.to_radians());
        (lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos())
            .clamp(-1.0, 1.0)
            .acos()
    }
}

#[cfg(test)]
mod tests {
    use super::Site;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn mt_washington() -> Site {
        Site::from_east(44.2705, -71.30325, 30.0).named("Mt Washington")
    }

    fn boston() -> Site {
        Site::from_east(42.3601, -71.0589, 10.0)
    }

    #[test]
    fn test_longitude_is_west_positive() {
        assert_relative_eq!(mt_washington().lon(), 71.30325);
        assert_relative_eq!(Site::from_east(10.0, 20.0, 0.0).lon(), 340.0);
        assert_relative_eq!(Site::from_east(10.0, 20.0, 0.0).lon_east(), 20.0);
        assert_relative_eq!(mt_washington().lon_east(), -71.30325);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let (a, b) = (mt_washington(), boston());
        assert_relative_eq!(a.distance(&b), b.distance(&a), max_relative = 1e-12);
        // About 132 miles as the crow flies.
        assert!((125.0..140.0).contains(&a.distance(&b)));
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_azimuth_reciprocity() {
        let (a, b) = (mt_washington(), boston());
        let forward = a.azimuth(&b);
        let back = b.azimuth(&a);
        // Boston is nearly due south and a touch east.
        assert!((170.0..180.0).contains(&forward), "{forward}");
        let reciprocal = (back - forward).rem_euclid(360.0);
        assert_abs_diff_eq!(reciprocal, 180.0, epsilon = 1.0);
    }

    #[test]
    fn test_cardinal_azimuths() {
        let origin = Site::new(0.0, 10.0, 0.0);
        assert_abs_diff_eq!(origin.azimuth(&Site::new(1.0, 10.0, 0.0)), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(origin.azimuth(&Site::new(0.0, 9.0, 0.0)), 90.0, epsilon = 1e-4);
        assert_abs_diff_eq!(origin.azimuth(&Site::new(-1.0, 10.0, 0.0)), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(origin.azimuth(&Site::new(0.0, 11.0, 0.0)), 270.0, epsilon = 1e-4);
        assert_eq!(origin.azimuth(&origin), 0.0);
    }

    #[test]
    fn test_to_agl() {
        let site = Site::new(40.0, 100.0, 1000.0).above_sea_level(true);
        let agl = site.to_agl(100.0);
        assert!(!agl.is_amsl());
        assert_relative_eq!(agl.alt(), 1000.0 - 100.0 / 0.3048);
        assert_eq!(boston().to_agl(100.0), boston());
    }
}
