//! Per-call working state.
//!
//! Everything the model computes along the way lives in a [`Context`]
//! that is created at the start of a prediction and dropped at the
//! end, so concurrent predictions never share anything.

use num_complex::Complex64;

/// Path geometry and intermediate results.
///
/// Heights and distances are in meters unless noted.
#[derive(Debug, Clone, Default)]
pub(crate) struct Prop {
    /// Reference attenuation (dB).
    pub aref: f64,
    /// Path distance.
    pub dist: f64,
    /// Antenna heights above ground, `[tx, rx]`.
    pub hg: [f64; 2],
    /// Antenna heights above mean sea level, `[tx, rx]`.
    pub rch: [f64; 2],
    /// Wave number (1/m), frequency / 47.7 MHz·m.
    pub wn: f64,
    /// Terrain irregularity (interdecile range).
    pub dh: f64,
    /// Surface refractivity (N-units).
    pub ens: f64,
    /// Clutter canopy refractivity (N-units).
    pub encc: f64,
    /// Average clutter height.
    pub cch: f64,
    /// Effective earth curvature (1/m).
    pub gme: f64,
    /// Surface transfer impedance of the ground.
    pub zgnd: Complex64,
    /// Effective antenna heights, `[tx, rx]`.
    pub he: [f64; 2],
    /// Horizon (or highest obstacle) distances, `[tx, rx]`.
    pub dl: [f64; 2],
    /// Horizon elevation angles, `[tx, rx]`.
    pub the: [f64; 2],
    /// Profile sample spacing.
    pub tiw: f64,
    /// Tx antenna height above mean sea level.
    pub ght: f64,
    /// Rx antenna height above mean sea level.
    pub ghr: f64,
    /// Ground height at the two-ray reflection point.
    pub rph: f64,
    /// Height of the obstacle seen by the tx.
    pub hht: f64,
    /// Height of the obstacle seen by the rx.
    pub hhr: f64,
    /// Source antenna height above its ground, for clutter loss.
    pub tgh: f64,
    /// Source ground height, for clutter loss.
    pub tsgh: f64,
    /// Receiver approach angle (radians).
    pub thera: f64,
    /// Terrain slope next to the receiver (radians).
    pub thenr: f64,
    /// Frequency/curvature scale length.
    pub xae: f64,
    /// Warning level, see [`crate::Warning`].
    pub kwx: u8,
    /// Negative when running point to point.
    pub mdp: i32,
    /// Polarization code: 0 horizontal, 1 vertical, 2 circular.
    pub ptx: i32,
    /// True when the path is line of sight.
    pub los: bool,
    pub wlos: bool,
    pub wscat: bool,
}

impl Prop {
    /// Raises the warning level to at least `level`.
    pub fn warn(&mut self, level: u8) {
        self.kwx = self.kwx.max(level);
    }
}

/// Attenuation-versus-distance coefficients.
#[derive(Debug, Clone, Default)]
pub(crate) struct PropA {
    /// Sum of the smooth-earth horizon distances.
    pub dlsa: f64,
    /// Distance where diffraction gives way to scatter.
    pub dx: f64,
    pub ael: f64,
    pub ak1: f64,
    pub ak2: f64,
    pub aed: f64,
    pub emd: f64,
    pub aes: f64,
    pub ems: f64,
    /// Smooth-earth horizon distances, `[tx, rx]`.
    pub dls: [f64; 2],
    /// Sum of the two horizon distances.
    pub dla: f64,
    /// Total bending angle (radians).
    pub tha: f64,
}

/// Everything a single prediction needs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    pub prop: Prop,
    pub propa: PropA,
}
