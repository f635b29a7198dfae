//! Line-of-sight attenuation.

use crate::state::{Prop, PropA};
use num_complex::Complex64;
use std::f64::consts::PI;

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Clutter attenuation in the line of sight ahead of an obstruction.
///
/// Models the signal entering a canopy of height `prop.cch` before
/// reaching a receiver at or below it.
#[allow(clippy::too_many_lines)]
pub(crate) fn saalos(dist: f64, prop: &Prop) -> f64 {
    if dist == 0.0 || prop.hg[1] > prop.cch {
        return 0.0;
    }

    let pd = dist;
    let pdk = pd / 1000.0;
    let freq_excess = ((prop.wn * 47.7).log10() - 2.0).max(0.01);

    if prop.tgh <= prop.cch {
        // Tx at or below the clutter.
        let mut q = (prop.cch - prop.tgh) * (2.06943 - 1.56184 * (1.0 / prop.cch - prop.tgh).exp());
        q += (17.98 - 0.84224 * (prop.cch - prop.tgh)) * (-0.000_000_61 * pd).exp();
        let arte = q + 1.34795 * 20.0 * (pd + 1.0).log10();
        return arte - freq_excess * (prop.hg[1] / prop.tgh);
    }

    // Tx above all clutter.
    let mut hone = prop.tgh + prop.tsgh - (prop.rch[1] - prop.hg[1]);
    let ensa = 1.0 + prop.ens * 0.000_001;
    let encca = 1.0 + prop.encc * 0.000_001;

    let mut dp = pd;
    let mut tic = 0.0;
    let mut cttc = 0.0;
    let mut crpc = 0.0;
    let mut ssnps = 0.0;
    let mut d1a = pd;
    for _ in 0..5 {
        let tde = dp / EARTH_RADIUS_M;
        let hc = (prop.cch + EARTH_RADIUS_M) * (1.0 - tde.cos());
        let dx = (prop.cch + EARTH_RADIUS_M) * tde.sin();
        let rise = hone - prop.cch + hc;
        let ucrpc = (rise * rise + dx * dx).sqrt();
        let ctip = rise / ucrpc;
        let tip = ctip.acos();
        tic = (tip + tde).max(0.0);
        let sta = (ensa / encca) * tic.sin();
        let ttc = sta.asin();
        cttc = (1.0 - ttc.sin() * ttc.sin()).sqrt();
        crpc = (prop.cch - prop.hg[1]) / cttc;
        if crpc >= dp {
            crpc = dp - 1.0 / dp;
        }
        ssnps = PI / 2.0 - tic;
        d1a = (crpc * ttc.sin()) / (1.0 - 1.0 / EARTH_RADIUS_M);
        dp = pd - d1a;
    }
    let ctic = tic.cos();

    let (rsp, tsp) = if ssnps <= 0.0 {
        // The path grazes the canopy before reaching it; move entry
        // toward the tx.
        d1a = (0.1 * pd).min(600.0);
        crpc = d1a;
        hone = prop.cch + 1.0;
        (0.997, 1.0 - 0.997)
    } else {
        let parallel = (ensa * cttc - encca * ctic) / (ensa * cttc + encca * ctic);
        let perpendicular = (ensa * ctic - encca * cttc) / (ensa * ctic + encca * cttc);
        let rsp = match prop.ptx {
            0 => perpendicular * perpendicular,
            1 => parallel * parallel,
            _ => (perpendicular * perpendicular + parallel * parallel) / 2.0,
        };
        (rsp, 1.0 - rsp)
    };

    let tvsr = (prop.tgh + prop.tsgh - prop.rch[1]).max(0.0);

    if d1a < 50.0 {
        0.0195 * crpc - 20.0 * tsp.log10()
    } else if d1a < 225.0 {
        let q = if tvsr > 1000.0 {
            d1a * (0.03 * (-0.14 * pdk).exp())
        } else {
            d1a * (0.07 * (-0.17 * pdk).exp())
        };
        q + (0.7 * pdk - freq_excess) * (prop.hg[1] / hone)
    } else {
        // A tx ground well under the rx ground can leave hone below the
        // canopy top.
        let hone = hone.max(prop.cch);
        let q = 0.00055 * pdk + pdk.log10() * (0.041 - 0.0017 * hone.sqrt() + 0.019);
        let arte = d1a * q - (18.0 * rsp.log10()) / (hone / 37.5).exp();
        let zi = 1.5 * (hone - prop.cch).sqrt();
        let q = if pdk > zi {
            (pdk - zi) * 10.2 * (freq_excess.sqrt() / (100.0 - zi))
        } else {
            ((zi - pdk) / zi) * (-20.0 * freq_excess) / hone.sqrt()
        };
        arte + q
    }
}

/// Longley-Rice line-of-sight attenuation at `dist`.
///
/// `wls` is the two-ray weighting from [`alos_weight`].
pub(crate) fn alos(wls: f64, dist: f64, prop: &Prop, propa: &PropA) -> f64 {
    let zgnd = prop.zgnd.re;
    let q = (1.0 - 0.8 * (-dist / 50e3).exp()) * prop.dh;
    let s = 0.78 * q * (-(q / 16.0).powf(0.25)).exp();
    let q = prop.he[0] + prop.he[1];
    let sps = q / (dist * dist + q * q).sqrt();
    let mut r = (sps - zgnd) / (sps + zgnd) * (-(prop.wn * s * sps).min(10.0)).exp();
    let q = r * r;
    if q < 0.25 || q < sps {
        r *= (sps / q).sqrt();
    }

    let alosv = propa.emd * dist + propa.aed;
    let mut q = prop.wn * prop.he[0] * prop.he[1] * 2.0 / dist;
    if q > 1.57 {
        q = 3.14 - 2.4649 / q;
    }
    let sum = Complex64::new(q.cos() + r, -q.sin());
    (-4.343 * sum.norm_sqr().ln() - alosv) * wls + alosv
}

/// Two-ray weighting used by [`alos`].
pub(crate) fn alos_weight(prop: &Prop, propa: &PropA) -> f64 {
    0.021 / (0.021 + prop.wn * prop.dh / propa.dlsa.max(10e3))
}

/// ITWOM line-of-sight attenuation over the whole path.
///
/// Two-ray interference against the reflection point found by the
/// horizon scan, plus canopy loss for receivers inside the clutter.
/// Leaves `prop.tgh` and `prop.tsgh` describing the tx.
pub(crate) fn alos2(prop: &mut Prop) -> f64 {
    let zgnd = prop.zgnd.re;
    let htg = prop.hg[0];
    let hrg = prop.hg[1];
    let pd = prop.dist;

    let q = prop.he[0] + prop.he[1];
    let sps = q / (pd * pd + q * q).sqrt();
    let mut q = (1.0 - 0.8 * (-pd / 50e3).exp()) * prop.dh;

    if prop.mdp < 0 {
        let dr = pd / (1.0 + hrg / htg);
        let half = 0.5 * pd;
        let offset = if dr < half { half - dr } else { dr - half };
        let drh = EARTH_RADIUS_M
            - (-(half * half) + EARTH_RADIUS_M * EARTH_RADIUS_M + offset * offset).sqrt();

        // Far from both ends with the receiver under the canopy.
        if sps < 0.05 && prop.cch > hrg && prop.dist < prop.dl[0] {
            let cd = (pd * (prop.cch - hrg) / (htg - hrg)).max(0.01);
            let cr = (pd - dr + dr * (prop.cch - drh) / htg).max(0.01);
            q = (1.0 - 0.8 * (-pd / 50e3).exp()) * prop.dh * (-20.0 * (cd / cr).log10()).min(1.0);
        }
    }

    let s = 0.78 * q * (-(q / 16.0).powf(0.25)).exp();
    let q = (-(prop.wn * s * sps).min(10.0)).exp();
    let mut r = q * (sps - zgnd) / (sps + zgnd);
    let q = (r * r).min(1.0);
    if q < 0.25 || q < sps {
        r *= (sps / q).sqrt();
    }

    let mut q = if prop.mdp < 0 {
        prop.wn * ((prop.ght - prop.rph) * (prop.ghr - prop.rph)) / (pd * PI)
    } else {
        prop.wn * prop.he[0] * prop.he[1] / (pd * PI)
    };
    q -= q.floor();
    let q = if q < 0.5 { q * PI } else { (1.0 - q) * PI };

    let re = Complex64::new(q.cos() + r, q.sin()).norm_sqr();
    let mut alosv = -10.0 * re.log10();

    prop.tgh = prop.hg[0];
    prop.tsgh = prop.rch[0] - prop.hg[0];

    if prop.hg[1] < prop.cch && prop.thera < 0.785 && prop.thenr < 0.785 {
        if sps < 0.05 {
            alosv += saalos(pd, prop);
        } else {
            alosv = saalos(pd, prop);
        }
    }

    alosv.min(22.0)
}

#[cfg(test)]
mod tests {
    use super::{alos2, saalos};
    use crate::state::Prop;
    use num_complex::Complex64;

    fn open_field() -> Prop {
        Prop {
            hg: [30.0, 30.0],
            he: [30.0, 30.0],
            rch: [30.0, 30.0],
            ght: 30.0,
            ghr: 30.0,
            dist: 10_000.0,
            wn: 900.0 / 47.7,
            gme: 1.18e-7,
            ens: 301.0,
            encc: 1000.0,
            cch: 22.5,
            zgnd: Complex64::new(3.74, 0.1),
            mdp: -1,
            ..Prop::default()
        }
    }

    #[test]
    fn test_saalos_is_zero_above_clutter() {
        let prop = open_field();
        assert_eq!(saalos(1000.0, &prop), 0.0);
    }

    #[test]
    fn test_alos2_is_bounded() {
        let mut prop = open_field();
        let loss = alos2(&mut prop);
        assert!(loss.is_finite());
        assert!(loss <= 22.0);
        assert_eq!(prop.tgh, 30.0);
        assert_eq!(prop.tsgh, 0.0);
    }
}
