use crate::{
    error::{PropagationError, Warning},
    math::qerfi,
    params::{Model, ModeVariability, Params},
    propagation::{prepare_itm, prepare_itwom, qlrps, reference_itm, reference_itwom},
    state::{Context, Prop},
    variability::Variability,
};
use std::fmt;

/// Which term dominates beyond the horizon.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominant {
    Diffraction,
    Troposcatter,
    /// The receiver sits on the last obstacle (ITWOM only).
    Peak,
}

/// Propagation mode of a prediction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropMode {
    /// Degenerate profile; loss is free space only.
    FreeSpace,
    LineOfSight,
    SingleHorizon(Dominant),
    DoubleHorizon(Dominant),
}

/// Result of a point-to-point prediction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Total path loss (dB), free space included.
    pub loss_db: f64,
    pub mode: PropMode,
    pub model: Model,
    pub warning: Option<Warning>,
    /// Terrain irregularity used by the model (meters).
    pub delta_h: f64,
}

impl Prediction {
    /// Mode in the wording each model traditionally reports.
    pub fn mode_description(&self) -> String {
        ModeDescription(self.model, self.mode).to_string()
    }
}

struct ModeDescription(Model, PropMode);

impl fmt::Display for ModeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (horizons, dominant) = match self.1 {
            PropMode::FreeSpace => return f.write_str("Free Space"),
            PropMode::LineOfSight => {
                return f.write_str(match self.0 {
                    Model::Itm => "Line-Of-Sight Mode",
                    Model::Itwom => "L-o-S",
                })
            }
            PropMode::SingleHorizon(d) => (1, d),
            PropMode::DoubleHorizon(d) => (2, d),
        };
        match self.0 {
            Model::Itm => {
                let horizons = if horizons == 1 { "Single" } else { "Double" };
                let dominant = match dominant {
                    Dominant::Troposcatter => "Troposcatter",
                    Dominant::Diffraction | Dominant::Peak => "Diffraction",
                };
                write!(f, "{horizons} Horizon, {dominant} Dominant")
            }
            Model::Itwom => {
                let dominant = match dominant {
                    Dominant::Diffraction => "Diff",
                    Dominant::Troposcatter => "Tropo",
                    Dominant::Peak => "Peak",
                };
                write!(f, "{horizons}_Hrzn_{dominant}")
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn validate(pfl: &[f64], tx_h: f64, rx_h: f64, params: &Params) -> Result<(), PropagationError> {
    if !(20.0..=20_000.0).contains(&params.frq_mhz) {
        return Err(PropagationError::Frequency(params.frq_mhz));
    }
    if !tx_h.is_finite() || tx_h <= 0.0 {
        return Err(PropagationError::TxTerminalHeight(tx_h));
    }
    if !rx_h.is_finite() || rx_h <= 0.0 {
        return Err(PropagationError::RxTerminalHeight(rx_h));
    }
    let claimed = pfl.first().copied().unwrap_or(f64::NAN);
    if pfl.len() < 3 || claimed < 0.0 || claimed.fract() != 0.0 || claimed + 3.0 != pfl.len() as f64 {
        return Err(PropagationError::ProfileLength {
            claimed,
            found: pfl.len().saturating_sub(2),
        });
    }
    // A single-point profile has no spacing to speak of.
    if !pfl[1].is_finite() || pfl[1] < 0.0 || (pfl[1] == 0.0 && claimed > 0.0) {
        return Err(PropagationError::ProfileSpacing(pfl[1]));
    }
    if let Some(idx) = pfl[2..].iter().position(|z| !z.is_finite()) {
        return Err(PropagationError::ProfileElevation(idx));
    }
    Ok(())
}

fn free_space(frq_mhz: f64, dist_m: f64) -> f64 {
    32.45 + 20.0 * frq_mhz.log10() + 20.0 * (dist_m / 1000.0).log10()
}

/// Mean elevation of the inner part of the profile.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn mean_elevation(pfl: &[f64]) -> f64 {
    let np = pfl[0] as usize;
    let ja = (3.0 + 0.1 * pfl[0]) as usize;
    let jb = np + 6 - ja;
    let sum: f64 = pfl[ja - 1..jb].iter().sum();
    sum / (jb + 1 - ja) as f64
}

/// Path loss between the two ends of a packed profile.
///
/// `pfl[0]` is the number of intervals, `pfl[1]` the spacing in meters
/// and the rest are `pfl[0] + 1` elevations from tx to rx. Antenna
/// heights are meters above ground.
///
/// # Errors
///
/// Returns [`PropagationError`] for inputs the model cannot evaluate,
/// including paths whose loss comes out non-finite. Parameters that
/// are merely outside the model's calibrated range produce a
/// [`Warning`] instead.
pub fn point_to_point(
    model: Model,
    pfl: &[f64],
    tx_h: f64,
    rx_h: f64,
    params: &Params,
) -> Result<Prediction, PropagationError> {
    validate(pfl, tx_h, rx_h, params)?;

    let conf = params.conf.clamp(0.01, 0.99);
    let rel = params.rel.clamp(0.01, 0.99);

    if pfl[0] < 1.0 {
        let dz = pfl[2] + tx_h - (pfl[pfl.len() - 1] + rx_h);
        let tpd = (dz * dz + pfl[0] * pfl[1] * pfl[0] * pfl[1]).sqrt().max(1.0);
        return Ok(Prediction {
            loss_db: free_space(params.frq_mhz, tpd),
            mode: PropMode::FreeSpace,
            model,
            warning: Some(Warning::CombinationOutOfRange),
            delta_h: 0.0,
        });
    }

    let zc = qerfi(conf);
    let zr = qerfi(rel);
    let zsys = mean_elevation(pfl);
    let ipol = params.pol as i32;

    let mut ctx = Context {
        prop: Prop {
            hg: [tx_h, rx_h],
            mdp: -1,
            ptx: ipol,
            encc: 1000.0,
            cch: 22.5,
            ..Prop::default()
        },
        ..Context::default()
    };

    qlrps(
        params.frq_mhz,
        zsys,
        params.eno_ns_surfref,
        ipol,
        params.eps_dielect,
        params.sgm_conductivity,
        &mut ctx.prop,
    );

    let variability = match model {
        Model::Itm => {
            prepare_itm(pfl, &mut ctx.prop);
            reference_itm(&mut ctx);
            Variability {
                climate: params.radio_climate,
                mode: ModeVariability::Mobile,
                no_location: true,
                no_situation: false,
            }
        }
        Model::Itwom => {
            prepare_itwom(pfl, &mut ctx.prop);
            reference_itwom(&mut ctx);
            Variability {
                climate: params.radio_climate,
                mode: ModeVariability::Accidental,
                no_location: false,
                no_situation: false,
            }
        }
    };

    let Context { prop, propa } = &mut ctx;
    let fs = match model {
        Model::Itm => free_space(params.frq_mhz, prop.dist),
        Model::Itwom => {
            let dz = prop.he[0] - prop.he[1];
            free_space(params.frq_mhz, (dz * dz + prop.dist * prop.dist).sqrt())
        }
    };

    let q = (prop.dist - propa.dla).trunc();
    let mode = if q < 0.0 {
        PropMode::LineOfSight
    } else {
        let dominant = if prop.dist <= propa.dlsa || prop.dist <= propa.dx {
            if model == Model::Itwom && prop.dl[1].trunc() == 0.0 {
                Dominant::Peak
            } else {
                Dominant::Diffraction
            }
        } else {
            Dominant::Troposcatter
        };
        if q == 0.0 {
            PropMode::SingleHorizon(dominant)
        } else {
            PropMode::DoubleHorizon(dominant)
        }
    };

    let loss_db = variability.avar(zr, 0.0, zc, prop) + fs;
    if !loss_db.is_finite() {
        return Err(PropagationError::NonFiniteLoss(loss_db));
    }

    Ok(Prediction {
        loss_db,
        mode,
        model,
        warning: Warning::from_kwx(prop.kwx),
        delta_h: prop.dh,
    })
}
