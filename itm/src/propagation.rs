//! Reference attenuation for a single path.
//!
//! The `prepare_*` functions turn a packed profile into path geometry,
//! the `reference_*` functions compute `prop.aref` from it.

use crate::{
    diffraction::{adiff2, Diffraction},
    horizon::{delta_h, hzns, hzns2, z1sq1, z1sq2, Deciles},
    los::{alos, alos2, alos_weight},
    math::fdim,
    scatter::Scatter,
    state::{Context, Prop, PropA},
};
use num_complex::Complex64;

/// Sets the frequency, refractivity and ground impedance terms.
///
/// `zsys` is the mean path elevation, used to scale the surface
/// refractivity down with altitude.
pub(crate) fn qlrps(fmhz: f64, zsys: f64, en0: f64, ipol: i32, eps: f64, sgm: f64, prop: &mut Prop) {
    const GMA: f64 = 157e-9;

    prop.wn = fmhz / 47.7;
    prop.ens = en0;
    if zsys != 0.0 {
        prop.ens *= (-zsys / 9460.0).exp();
    }
    prop.gme = GMA * (1.0 - 0.04665 * (prop.ens / 179.3).exp());

    let zq = Complex64::new(eps, 376.62 * sgm / prop.wn);
    let mut zgnd = (zq - 1.0).sqrt();
    if ipol != 0 {
        zgnd /= zq;
    }
    prop.zgnd = zgnd;
}

/// Smooth-earth horizon distance for effective height `he`.
fn smooth_horizon(he: f64, gme: f64, dh: f64) -> f64 {
    (2.0 * he / gme).sqrt() * (-0.07 * (dh / he.max(5.0)).sqrt()).exp()
}

/// Refits effective heights, horizons and angles for a path whose
/// horizons lie beyond the profile itself.
fn refit_smooth_path(prop: &mut Prop) {
    let mut q = 1.0;
    for j in 0..2 {
        prop.dl[j] = smooth_horizon(prop.he[j], prop.gme, prop.dh);
    }
    let dlsum = prop.dl[0] + prop.dl[1];
    if dlsum <= prop.dist {
        q = (prop.dist / dlsum).powi(2);
    }
    for j in 0..2 {
        prop.he[j] *= q;
        prop.dl[j] = smooth_horizon(prop.he[j], prop.gme, prop.dh);
    }
    for j in 0..2 {
        let q = (2.0 * prop.he[j] / prop.gme).sqrt();
        prop.the[j] = (0.65 * prop.dh * (q / prop.dl[j] - 1.0) - 2.0 * prop.he[j]) / q;
    }
}

fn fit_window(prop: &Prop) -> [f64; 2] {
    let mut xl = [0.0; 2];
    for (j, x) in xl.iter_mut().enumerate() {
        *x = (15.0 * prop.hg[j]).min(0.1 * prop.dl[j]);
    }
    xl[1] = prop.dist - xl[1];
    xl
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn intervals(pfl: &[f64]) -> usize {
    pfl[0] as usize
}

/// Longley-Rice path analysis.
pub(crate) fn prepare_itm(pfl: &[f64], prop: &mut Prop) {
    let np = intervals(pfl);
    prop.dist = pfl[0] * pfl[1];
    hzns(pfl, prop);

    let xl = fit_window(prop);
    prop.dh = delta_h(pfl, xl[0], xl[1], Deciles::Capped);

    if prop.dl[0] + prop.dl[1] > 1.5 * prop.dist {
        let (za, zb) = z1sq1(pfl, xl[0], xl[1]);
        prop.he[0] = prop.hg[0] + fdim(pfl[2], za);
        prop.he[1] = prop.hg[1] + fdim(pfl[np + 2], zb);

        refit_smooth_path(prop);
    } else {
        let (za, _) = z1sq1(pfl, xl[0], 0.9 * prop.dl[0]);
        let (_, zb) = z1sq1(pfl, prop.dist - 0.9 * prop.dl[1], xl[1]);
        prop.he[0] = prop.hg[0] + fdim(pfl[2], za);
        prop.he[1] = prop.hg[1] + fdim(pfl[np + 2], zb);
    }

    prop.mdp = -1;
}

/// ITWOM path analysis.
///
/// Coarse profiles (spacing over 150 m) fall back to smooth-earth
/// fitting, otherwise effective heights are the antenna heights above
/// sea level (never less than the antenna height above ground) and the
/// receiver approach angles are measured.
pub(crate) fn prepare_itwom(pfl: &[f64], prop: &mut Prop) {
    let np = intervals(pfl);
    prop.dist = pfl[0] * pfl[1];
    hzns2(pfl, prop);

    let dlb = prop.dl[0] + prop.dl[1];
    prop.rch[0] = prop.hg[0] + pfl[2];
    prop.rch[1] = prop.hg[1] + pfl[np + 2];

    let xl = fit_window(prop);
    prop.dh = delta_h(pfl, xl[0], xl[1], Deciles::Dynamic);

    if np < 1 || pfl[1] > 150.0 {
        if dlb < 1.5 * prop.dist {
            let (za, _) = z1sq2(pfl, xl[0], 0.9 * prop.dl[0]);
            let (_, zb) = z1sq2(pfl, prop.dist - 0.9 * prop.dl[1], xl[1]);
            prop.he[0] = prop.hg[0] + fdim(pfl[2], za);
            prop.he[1] = prop.hg[1] + fdim(pfl[np + 2], zb);
        } else {
            let (za, zb) = z1sq2(pfl, xl[0], xl[1]);
            prop.he[0] = prop.hg[0] + fdim(pfl[2], za);
            prop.he[1] = prop.hg[1] + fdim(pfl[np + 2], zb);
            refit_smooth_path(prop);
        }
    } else {
        // Ground below sea level counts as sea level.
        prop.he[0] = prop.hg[0] + pfl[2].max(0.0);
        prop.he[1] = prop.hg[1] + pfl[np + 2].max(0.0);

        // Slope of the last half kilometer toward the receiver.
        let (rae1, rae2) = if prop.dist > 550.0 {
            z1sq2(pfl, prop.dist - 500.0, prop.dist)
        } else {
            (0.0, 0.0)
        };
        prop.thera = ((rae2 - rae1).abs() / prop.dist).atan();
        if rae2 < rae1 {
            prop.thera = -prop.thera;
        }
        prop.thenr = ((pfl[np + 2] - pfl[np + 1]).max(0.0) / pfl[1]).atan();
    }

    prop.mdp = -1;
}

/// Range checks shared by both models.
fn check_ranges(prop: &mut Prop) {
    if prop.wn < 0.838 || prop.wn > 210.0 {
        prop.warn(1);
    }
    for j in 0..2 {
        if prop.hg[j] < 1.0 || prop.hg[j] > 1000.0 {
            prop.warn(1);
        }
    }
}

fn check_out_of_range(prop: &mut Prop) {
    if prop.ens < 250.0
        || prop.ens > 400.0
        || prop.gme < 75e-9
        || prop.gme > 250e-9
        || prop.zgnd.re <= prop.zgnd.im.abs()
        || prop.wn < 0.419
        || prop.wn > 420.0
    {
        prop.kwx = 4;
    }
    for j in 0..2 {
        if prop.hg[j] < 0.5 || prop.hg[j] > 3000.0 {
            prop.kwx = 4;
        }
    }
}

fn check_distance(prop: &mut Prop) {
    if prop.dist > 0.0 {
        if prop.dist > 1000e3 {
            prop.warn(1);
        }
        let dmin = (prop.he[0] - prop.he[1]).abs() / 200e-3;
        if prop.dist < dmin {
            prop.warn(3);
        }
        if prop.dist < 1e3 || prop.dist > 2000e3 {
            prop.kwx = 4;
        }
    }
}

fn horizon_setup(prop: &mut Prop, propa: &mut PropA, dlsa_cap: f64) {
    for j in 0..2 {
        propa.dls[j] = (2.0 * prop.he[j] / prop.gme).sqrt();
    }
    propa.dlsa = (propa.dls[0] + propa.dls[1]).min(dlsa_cap);
    propa.dla = prop.dl[0] + prop.dl[1];
    propa.tha = (prop.the[0] + prop.the[1]).max(-propa.dla * prop.gme);
    prop.wlos = false;
    prop.wscat = false;
}

/// Diffraction-line distances bracketing the far end of the
/// line-of-sight region.
fn diffraction_distances(prop: &mut Prop, propa: &PropA) -> (f64, f64) {
    prop.xae = (prop.wn * (prop.gme * prop.gme)).powf(-1.0 / 3.0);
    let d3 = propa.dlsa.max(1.3787 * prop.xae + propa.dla);
    let d4 = d3 + 2.7574 * prop.xae;
    (d3, d4)
}

/// Longley-Rice reference attenuation.
pub(crate) fn reference_itm(ctx: &mut Context) {
    let Context { prop, propa } = ctx;

    horizon_setup(prop, propa, f64::INFINITY);
    check_ranges(prop);
    for j in 0..2 {
        if prop.the[j].abs() > 200e-3 || prop.dl[j] < 0.1 * propa.dls[j] || prop.dl[j] > 3.0 * propa.dls[j] {
            prop.warn(3);
        }
    }
    check_out_of_range(prop);

    let diffraction = Diffraction::itm(prop, propa);
    let (d3, d4) = diffraction_distances(prop, propa);
    let a3 = diffraction.adiff(d3, prop, propa);
    let a4 = diffraction.adiff(d4, prop, propa);
    propa.emd = (a4 - a3) / (d4 - d3);
    propa.aed = a3 - propa.emd * d3;

    check_distance(prop);

    if prop.dist < propa.dlsa {
        fit_line_of_sight(prop, propa);
        if prop.dist > 0.0 {
            prop.aref = propa.ael + propa.ak1 * prop.dist + propa.ak2 * prop.dist.ln();
        }
    }

    if prop.dist <= 0.0 || prop.dist >= propa.dlsa {
        fit_scatter(prop, propa);
        prop.aref = if prop.dist > propa.dx {
            propa.aes + propa.ems * prop.dist
        } else {
            propa.aed + propa.emd * prop.dist
        };
    }

    prop.aref = prop.aref.max(0.0);
}

/// Fits `ael + ak1·d + ak2·ln(d)` through three line-of-sight points.
fn fit_line_of_sight(prop: &mut Prop, propa: &mut PropA) {
    let wls = alos_weight(prop, propa);
    let d2 = propa.dlsa;
    let a2 = propa.aed + d2 * propa.emd;
    let mut d0 = 1.908 * prop.wn * prop.he[0] * prop.he[1];
    let d1 = if propa.aed >= 0.0 {
        d0 = d0.min(0.5 * propa.dla);
        d0 + 0.25 * (propa.dla - d0)
    } else {
        (-propa.aed / propa.emd).max(0.25 * propa.dla)
    };
    let a1 = alos(wls, d1, prop, propa);

    if d0 < d1 {
        let a0 = alos(wls, d0, prop, propa);
        let q = (d2 / d0).ln();
        propa.ak2 = (((d2 - d0) * (a1 - a0) - (d1 - d0) * (a2 - a0))
            / ((d2 - d0) * (d1 / d0).ln() - (d1 - d0) * q))
            .max(0.0);
        if propa.aed >= 0.0 || propa.ak2 > 0.0 {
            propa.ak1 = (a2 - a0 - propa.ak2 * q) / (d2 - d0);
            if propa.ak1 < 0.0 {
                propa.ak1 = 0.0;
                propa.ak2 = fdim(a2, a0) / q;
                if propa.ak2 == 0.0 {
                    propa.ak1 = propa.emd;
                }
            }
        } else {
            propa.ak2 = 0.0;
            propa.ak1 = (a2 - a1) / (d2 - d1);
            if propa.ak1 <= 0.0 {
                propa.ak1 = propa.emd;
            }
        }
    } else {
        propa.ak1 = (a2 - a1) / (d2 - d1);
        propa.ak2 = 0.0;
        if propa.ak1 <= 0.0 {
            propa.ak1 = propa.emd;
        }
    }

    propa.ael = a2 - propa.ak1 * d2 - propa.ak2 * d2.ln();
    prop.wlos = true;
}

/// Fits the scatter line and where it takes over from diffraction.
fn fit_scatter(prop: &mut Prop, propa: &mut PropA) {
    let mut scatter = Scatter::new(prop);
    let d5 = propa.dla + 200e3;
    let d6 = d5 + 200e3;
    let a6 = scatter.ascat(d6, prop, propa);
    let a5 = scatter.ascat(d5, prop, propa);

    if a5 < 1000.0 {
        propa.ems = (a6 - a5) / 200e3;
        propa.dx = propa.dlsa.max(
            (propa.dla + 0.3 * prop.xae * (47.7 * prop.wn).ln())
                .max((a5 - propa.aed - propa.ems * d5) / (propa.emd - propa.ems)),
        );
        propa.aes = (propa.emd - propa.ems) * propa.dx + propa.aed;
    } else {
        propa.ems = propa.emd;
        propa.aes = propa.aed;
        propa.dx = 10.0e6;
    }
    prop.wscat = true;
}

/// ITWOM reference attenuation.
pub(crate) fn reference_itwom(ctx: &mut Context) {
    let Context { prop, propa } = ctx;
    let pd1 = prop.dist;
    propa.dx = 2_000_000.0;

    horizon_setup(prop, propa, 1_000_000.0);
    check_ranges(prop);
    if prop.the[0].abs() > 200e-3 {
        prop.warn(3);
    }
    if prop.the[1].abs() > 1.220 {
        prop.warn(3);
    }
    check_out_of_range(prop);

    let (d3, d4) = diffraction_distances(prop, propa);
    let a3 = adiff2(d3, prop, propa);
    let a4 = adiff2(d4, prop, propa);
    propa.emd = (a4 - a3) / (d4 - d3);
    propa.aed = a3 - propa.emd * d3;

    check_distance(prop);

    if prop.dist < propa.dlsa {
        if !prop.wlos {
            // Presets tgh and tsgh for the tx.
            alos2(prop);
            prop.wlos = true;
        }
        if prop.los {
            prop.aref = alos2(prop);
        } else {
            let past_horizon = (prop.dist - prop.dl[0]).trunc();
            prop.aref = if past_horizon == 0.0 {
                5.8 + alos2(prop)
            } else if past_horizon > 0.0 {
                adiff2(pd1, prop, propa)
            } else {
                1.0
            };
        }
    }

    if (prop.dist <= 0.0 || prop.dist >= propa.dlsa) && !prop.wscat {
        let mut scatter = Scatter::new(prop);
        let a6 = scatter.ascat(pd1, prop, propa);
        let a5 = adiff2(pd1, prop, propa);
        if a5 <= a6 {
            propa.dx = 10_000_000.0;
            prop.aref = a5;
        } else {
            propa.dx = propa.dlsa;
            prop.aref = a6;
        }
        prop.wscat = true;
    }

    prop.aref = prop.aref.max(0.0);
}
