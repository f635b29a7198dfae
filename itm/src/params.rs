/// Antenna polarization.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    Horizontal = 0,
    Vertical = 1,
    /// Only meaningful to the ITWOM clutter model; Longley-Rice treats
    /// it as vertical.
    Circular = 2,
}

/// Radio climate.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Climate {
    Equatorial = 1,
    ContinentalSubtropical = 2,
    MaritimeSubtropical = 3,
    Desert = 4,
    ContinentalTemperate = 5,
    MaritimeTemperateOverLand = 6,
    MaritimeTemperateOverSea = 7,
}

impl Climate {
    /// Zero-based row into the climate tables.
    pub(crate) fn index(self) -> usize {
        self as usize - 1
    }
}

/// Mode of variability.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeVariability {
    SingleMessage = 0,
    Accidental = 1,
    Mobile = 2,
    Broadcast = 3,
}

/// Which propagation model to run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    /// Longley-Rice 1.2.2.
    Itm,
    /// Irregular Terrain With Obstructions Model 3.0.
    #[default]
    Itwom,
}

/// Radio and ground parameters for a prediction.
///
/// # Suggested Surface Paramters
///
/// | Ground attribute | Ground Conductivity | Relative ground Permittivity |
/// |------------------|--------------------:|-----------------------------:|
/// | Poor ground      |               0.001 |                            4 |
/// | Average ground   |               0.005 |                           15 |
/// | Good ground      |                0.02 |                           25 |
/// | Fresh water      |                0.01 |                           25 |
/// | Sea water        |                 5.0 |                           25 |
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Relative ground permittivity.
    pub eps_dielect: f64,
    /// Ground conductivity (Siemens/meter).
    pub sgm_conductivity: f64,
    /// Surface refractivity (N-units, 301 is a 4/3 earth).
    pub eno_ns_surfref: f64,
    /// Carrier frequency (MHz).
    pub frq_mhz: f64,
    pub radio_climate: Climate,
    pub pol: Polarization,
    /// Confidence fraction, clamped to `0.01..=0.99`.
    pub conf: f64,
    /// Reliability fraction, clamped to `0.01..=0.99`.
    pub rel: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            eps_dielect: 15.0,
            sgm_conductivity: 0.005,
            eno_ns_surfref: 301.0,
            frq_mhz: 900.0,
            radio_climate: Climate::ContinentalTemperate,
            pol: Polarization::Vertical,
            conf: 0.5,
            rel: 0.5,
        }
    }
}
