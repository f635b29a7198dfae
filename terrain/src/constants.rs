/// Mean radius of the earth (meters).
pub const MEAN_EARTH_RADIUS: f64 = 6_371_000.0;

/// Earth radius used for great-circle distances (miles).
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Effective earth radius factor for standard atmospheric refraction.
pub const FOUR_THIRDS: f64 = 4.0 / 3.0;

pub const METERS_PER_MILE: f64 = 1609.344;

pub const METERS_PER_FOOT: f64 = 0.3048;

pub const FEET_PER_MILE: f64 = 5280.0;

pub const KM_PER_MILE: f64 = 1.609_344;
