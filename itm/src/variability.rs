//! Long-term variability.
//!
//! Converts the reference attenuation into a loss not exceeded for the
//! requested time, location and situation fractions.

use crate::{math::curve, params::ModeVariability, state::Prop, Climate};

/// Climate-dependent curve coefficients, one column per [`Climate`].
struct ClimateTable {
    bv1: [f64; 7],
    bv2: [f64; 7],
    xv1: [f64; 7],
    xv2: [f64; 7],
    xv3: [f64; 7],
    bsm1: [f64; 7],
    bsm2: [f64; 7],
    xsm1: [f64; 7],
    xsm2: [f64; 7],
    xsm3: [f64; 7],
    bsp1: [f64; 7],
    bsp2: [f64; 7],
    xsp1: [f64; 7],
    xsp2: [f64; 7],
    xsp3: [f64; 7],
    bsd1: [f64; 7],
    bzd1: [f64; 7],
    bfm1: [f64; 7],
    bfm2: [f64; 7],
    bfm3: [f64; 7],
    bfp1: [f64; 7],
    bfp2: [f64; 7],
    bfp3: [f64; 7],
}

const CLIMATES: ClimateTable = ClimateTable {
    bv1: [-9.67, -0.62, 1.26, -9.21, -0.62, -0.39, 3.15],
    bv2: [12.7, 9.19, 15.5, 9.05, 9.19, 2.86, 857.9],
    xv1: [144.9e3, 228.9e3, 262.6e3, 84.1e3, 228.9e3, 141.7e3, 2222.0e3],
    xv2: [190.3e3, 205.2e3, 185.2e3, 101.1e3, 205.2e3, 315.9e3, 164.8e3],
    xv3: [133.8e3, 143.6e3, 99.8e3, 98.6e3, 143.6e3, 167.4e3, 116.3e3],
    bsm1: [2.13, 2.66, 6.11, 1.98, 2.68, 6.86, 8.51],
    bsm2: [159.5, 7.67, 6.65, 13.11, 7.16, 10.38, 169.8],
    xsm1: [762.2e3, 100.4e3, 138.2e3, 139.1e3, 93.7e3, 187.8e3, 609.8e3],
    xsm2: [123.6e3, 172.5e3, 242.2e3, 132.7e3, 186.8e3, 169.6e3, 119.9e3],
    xsm3: [94.5e3, 136.4e3, 178.6e3, 193.5e3, 133.5e3, 108.9e3, 106.6e3],
    bsp1: [2.11, 6.87, 10.08, 3.68, 4.75, 8.58, 8.43],
    bsp2: [102.3, 15.53, 9.60, 159.3, 8.12, 13.97, 8.19],
    xsp1: [636.9e3, 138.7e3, 165.3e3, 464.4e3, 93.2e3, 216.0e3, 136.2e3],
    xsp2: [134.8e3, 143.7e3, 225.7e3, 93.1e3, 135.9e3, 152.0e3, 188.5e3],
    xsp3: [95.6e3, 98.6e3, 129.7e3, 94.2e3, 113.4e3, 122.7e3, 122.9e3],
    bsd1: [1.224, 0.801, 1.380, 1.000, 1.224, 1.518, 1.518],
    bzd1: [1.282, 2.161, 1.282, 20., 1.282, 1.282, 1.282],
    bfm1: [1.0, 1.0, 1.0, 1.0, 0.92, 1.0, 1.0],
    bfm2: [0.0, 0.0, 0.0, 0.0, 0.25, 0.0, 0.0],
    bfm3: [0.0, 0.0, 0.0, 0.0, 1.77, 0.0, 0.0],
    bfp1: [1.0, 0.93, 1.0, 0.93, 0.93, 1.0, 1.0],
    bfp2: [0.0, 0.31, 0.0, 0.19, 0.31, 0.0, 0.0],
    bfp3: [0.0, 2.00, 0.0, 1.79, 2.00, 0.0, 0.0],
};

/// How the statistics are folded together.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Variability {
    pub climate: Climate,
    pub mode: ModeVariability,
    /// Drop location variability (point-to-point links).
    pub no_location: bool,
    /// Drop situation variability.
    pub no_situation: bool,
}

impl Variability {
    /// Loss for standard normal deviates `zt` (time), `zl` (location)
    /// and `zc` (confidence).
    #[allow(clippy::many_single_char_names)]
    pub(crate) fn avar(&self, zzt: f64, zzl: f64, zzc: f64, prop: &mut Prop) -> f64 {
        const RT: f64 = 7.8;
        const RL: f64 = 24.0;

        let k = self.climate.index();
        let t = &CLIMATES;

        let q = (0.133 * prop.wn).ln();
        let gm = t.bfm1[k] + t.bfm2[k] / ((t.bfm3[k] * q).powi(2) + 1.0);
        let gp = t.bfp1[k] + t.bfp2[k] / ((t.bfp3[k] * q).powi(2) + 1.0);

        let dexa = (18e6 * prop.he[0]).sqrt() + (18e6 * prop.he[1]).sqrt() + (575.7e12 / prop.wn).cbrt();
        let de = if prop.dist < dexa {
            130e3 * prop.dist / dexa
        } else {
            130e3 + prop.dist - dexa
        };

        let vmd = curve(t.bv1[k], t.bv2[k], t.xv1[k], t.xv2[k], t.xv3[k], de);
        let sgtm = curve(t.bsm1[k], t.bsm2[k], t.xsm1[k], t.xsm2[k], t.xsm3[k], de) * gm;
        let sgtp = curve(t.bsp1[k], t.bsp2[k], t.xsp1[k], t.xsp2[k], t.xsp3[k], de) * gp;
        let sgtd = sgtp * t.bsd1[k];
        let zd = t.bzd1[k];
        let tgtd = (sgtp - sgtd) * zd;

        let sgl = if self.no_location {
            0.0
        } else {
            let q = (1.0 - 0.8 * (-prop.dist / 50e3).exp()) * prop.dh * prop.wn;
            10.0 * q / (q + 13.0)
        };

        let vs0 = if self.no_situation {
            0.0
        } else {
            (5.0 + 3.0 * (-de / 100e3).exp()).powi(2)
        };

        let zc = zzc;
        let (zt, zl) = match self.mode {
            ModeVariability::SingleMessage => (zc, zc),
            ModeVariability::Accidental => (zzt, zc),
            ModeVariability::Mobile => (zzt, zzt),
            ModeVariability::Broadcast => (zzt, zzl),
        };

        if zt.abs() > 3.1 || zl.abs() > 3.1 || zc.abs() > 3.1 {
            prop.warn(1);
        }

        let sgt = if zt < 0.0 {
            sgtm
        } else if zt <= zd {
            sgtp
        } else {
            sgtd + tgtd / zt
        };

        let vs = vs0 + (sgt * zt).powi(2) / (RT + zc * zc) + (sgl * zl).powi(2) / (RL + zc * zc);

        let (yr, sgc) = match self.mode {
            ModeVariability::SingleMessage => (0.0, (sgt * sgt + sgl * sgl + vs).sqrt()),
            ModeVariability::Accidental => (sgt * zt, (sgl * sgl + vs).sqrt()),
            ModeVariability::Mobile => ((sgt * sgt + sgl * sgl).sqrt() * zt, vs.sqrt()),
            ModeVariability::Broadcast => (sgt * zt + sgl * zl, vs.sqrt()),
        };

        let avarv = prop.aref - vmd - yr - sgc * zc;
        if avarv < 0.0 {
            avarv * (29.0 - avarv) / (29.0 - 10.0 * avarv)
        } else {
            avarv
        }
    }
}
