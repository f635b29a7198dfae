//! Antenna gain as a function of azimuth and elevation.

use crate::CoverageError;

/// Azimuths, one per whole degree including both 0 and 360.
pub const AZIMUTHS: usize = 361;

/// Elevation buckets, one per tenth of a degree from +10° down to
/// -90°.
pub const ELEVATION_BUCKETS: usize = 1001;

/// Gain table indexed by whole-degree azimuth and elevation bucket.
///
/// Gains are linear field ratios, normally in `0..=1`. A zero entry
/// means the pattern has no data there and the path is left alone.
#[derive(Clone, PartialEq)]
pub struct AntennaPattern {
    gains: Box<[f32]>,
}

impl AntennaPattern {
    /// Returns an isotropic pattern.
    pub fn isotropic() -> Self {
        Self::from_fn(|_, _| 1.0)
    }

    /// Returns a pattern whose gain at (`azimuth`, `bucket`) is
    /// `f(azimuth, bucket)`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(usize, usize) -> f32,
    {
        let gains = (0..AZIMUTHS)
            .flat_map(|az| (0..ELEVATION_BUCKETS).map(move |bucket| (az, bucket)))
            .map(|(az, bucket)| f(az, bucket))
            .collect();
        Self { gains }
    }

    /// Builds a pattern from gains in azimuth-major order.
    ///
    /// # Errors
    ///
    /// Fails unless there are exactly [`AZIMUTHS`] ×
    /// [`ELEVATION_BUCKETS`] finite, non-negative gains.
    pub fn from_gains(gains: Vec<f32>) -> Result<Self, CoverageError> {
        let expected = AZIMUTHS * ELEVATION_BUCKETS;
        if gains.len() != expected {
            return Err(CoverageError::PatternShape {
                expected,
                found: gains.len(),
            });
        }
        if let Some(i) = gains.iter().position(|g| !g.is_finite() || *g < 0.0) {
            return Err(CoverageError::PatternGain {
                azimuth: i / ELEVATION_BUCKETS,
                bucket: i % ELEVATION_BUCKETS,
                gain: gains[i],
            });
        }
        Ok(Self {
            gains: gains.into_boxed_slice(),
        })
    }

    /// Returns the elevation bucket for `elevation` degrees.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bucket(elevation: f64) -> usize {
        let bucket = (10.0 * (10.0 - elevation)).round_ties_even();
        if bucket.is_nan() {
            return 0;
        }
        bucket.clamp(0.0, (ELEVATION_BUCKETS - 1) as f64) as usize
    }

    /// Returns the raw gain, or `None` where the pattern has no data.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn gain(&self, azimuth: f64, elevation: f64) -> Option<f32> {
        let az = azimuth.round_ties_even();
        let az = if az.is_nan() {
            0
        } else {
            az.clamp(0.0, (AZIMUTHS - 1) as f64) as usize
        };
        let gain = self.gains[az * ELEVATION_BUCKETS + Self::bucket(elevation)];
        (gain != 0.0).then_some(gain)
    }

    /// Extra path loss (dB) in the direction of (`azimuth`,
    /// `elevation`); 0 where the pattern has no data.
    pub fn loss_db(&self, azimuth: f64, elevation: f64) -> f64 {
        self.gain(azimuth, elevation)
            .map_or(0.0, |gain| -20.0 * f64::from(gain).log10())
    }
}

impl std::fmt::Debug for AntennaPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntennaPattern")
            .field("azimuths", &AZIMUTHS)
            .field("elevation_buckets", &ELEVATION_BUCKETS)
            .finish_non_exhaustive()
    }
}
