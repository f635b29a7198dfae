mod elevation_angle;
mod great_circle;

pub use elevation_angle::{cos_angle, elevation_angle};
pub use great_circle::{destination, GreatCircleIter};

/// Signed difference `lon1 - lon2` in degrees, folded into
/// `(-180, 180)`.
pub fn lon_diff(lon1: f64, lon2: f64) -> f64 {
    let mut diff = lon1 - lon2;
    if diff <= -180.0 {
        diff += 360.0;
    }
    if diff >= 180.0 {
        diff -= 360.0;
    }
    diff
}
