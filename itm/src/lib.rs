//! Longley-Rice (ITM 1.2.2) and ITWOM 3.0 point-to-point path loss.
//!
//! Every prediction builds its own working state, so [`point_to_point`]
//! and [`p2p`] can be called from any number of threads at once and
//! always return bit-identical results for identical inputs.

mod diffraction;
mod error;
mod horizon;
mod los;
mod math;
mod p2p;
mod params;
mod propagation;
mod scatter;
mod state;
mod variability;

pub use crate::error::{PropagationError, Warning};
pub use math::{qerf, qerfi};
pub use p2p::{point_to_point, Dominant, Prediction, PropMode};
pub use params::{Climate, ModeVariability, Model, Params, Polarization};

/// Returns the path loss over evenly spaced terrain samples.
///
/// Packs `terrain` into the profile layout [`point_to_point`] expects.
///
/// # Parameters
///
/// - `model`: see [`Model`]
/// - `h_tx_meter`: transmiter height above ground (meters)
/// - `h_rx_meter`: receiver height above ground (meters)
/// - `step_size_m`: distance between each elevation sample (meters)
/// - `terrain`: elevation samples spaced `step_size_m` apart from eachother (meters)
/// - `params`: see [`Params`]
///
/// # Errors
///
/// See [`point_to_point`].
pub fn p2p<T>(
    model: Model,
    h_tx_meter: f64,
    h_rx_meter: f64,
    step_size_m: f64,
    terrain: &[T],
    params: &Params,
) -> Result<Prediction, PropagationError>
where
    T: Copy,
    f64: From<T>,
{
    let pfl = {
        let mut pfl: Vec<f64> = Vec::with_capacity(terrain.len() + 2);
        // Two header slots, but the first counts intervals, not samples.
        #[allow(clippy::cast_precision_loss)]
        pfl.push(terrain.len().saturating_sub(1) as f64);
        pfl.push(step_size_m);
        pfl.extend(terrain.iter().map(|elev| f64::from(*elev)));
        pfl
    };
    point_to_point(model, &pfl, h_tx_meter, h_rx_meter, params)
}
