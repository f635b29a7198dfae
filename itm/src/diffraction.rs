//! Diffraction attenuation.

use crate::{
    los::saalos,
    math::{aknfe, fht},
    state::{Prop, PropA},
};

/// Longley-Rice rounded-earth coefficients.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Diffraction {
    wd1: f64,
    xd1: f64,
    afo: f64,
    qk: f64,
    aht: f64,
    xht: f64,
}

impl Diffraction {
    pub(crate) fn itm(prop: &Prop, propa: &PropA) -> Self {
        let mut q = prop.hg[0] * prop.hg[1];
        let qk = prop.he[0] * prop.he[1] - q;
        if prop.mdp < 0 {
            q += 10.0;
        }
        let wd1 = (1.0 + qk / q).sqrt();
        let xd1 = propa.dla + propa.tha / prop.gme;
        let q = (1.0 - 0.8 * (-propa.dlsa / 50e3).exp()) * prop.dh;
        let q = q * 0.78 * (-(q / 16.0).powf(0.25)).exp();
        let mut diffraction = Self {
            wd1,
            xd1,
            afo: (2.171 * (1.0 + 4.77e-4 * prop.hg[0] * prop.hg[1] * prop.wn * q).ln()).min(15.0),
            qk: 1.0 / prop.zgnd.norm(),
            aht: 20.0,
            xht: 0.0,
        };
        for j in 0..2 {
            let (x, gain) = diffraction.height_gain(prop, j);
            diffraction.xht += x;
            diffraction.aht += gain;
        }
        diffraction
    }

    /// Height-gain contribution of terminal `j`, returns `(x, fht)`.
    fn height_gain(&self, prop: &Prop, j: usize) -> (f64, f64) {
        let a = 0.5 * (prop.dl[j] * prop.dl[j]) / prop.he[j];
        let wa = (a * prop.wn).cbrt();
        let pk = self.qk / wa;
        let q = (1.607 - pk) * 151.0 * wa * prop.dl[j] / a;
        (q, fht(q, pk))
    }

    /// Longley-Rice diffraction attenuation at `dist`, a weighted mix
    /// of double knife-edge and smooth rounded earth.
    pub(crate) fn adiff(&self, dist: f64, prop: &Prop, propa: &PropA) -> f64 {
        let th = propa.tha + dist * prop.gme;
        let ds = dist - propa.dla;
        let q = 0.079_577_5 * prop.wn * ds * th * th;
        let knife = aknfe(q * prop.dl[0] / (ds + prop.dl[0])) + aknfe(q * prop.dl[1] / (ds + prop.dl[1]));
        let a = ds / th;
        let wa = (a * prop.wn).cbrt();
        let pk = self.qk / wa;
        let q = (1.607 - pk) * 151.0 * wa * th + self.xht;
        let ar = 0.05751 * q - 4.343 * q.ln() - self.aht;
        let q = (self.wd1 + self.xd1 / dist)
            * ((1.0 - 0.8 * (-dist / 50e3).exp()) * prop.dh * prop.wn).min(6283.2);
        let wd = 25.1 / (25.1 + q.sqrt());
        ar * wd + (1.0 - wd) * knife + self.afo
    }
}

/// Direct and obstacle-relative path lengths used by [`adiff2`].
struct Geometry {
    dto: f64,
    dto1: f64,
    dtro: f64,
    drto: f64,
    dro: f64,
    dro2: f64,
    dtr: f64,
    dhh1: f64,
    dhh2: f64,
    dtof: f64,
    drof: f64,
}

impl Geometry {
    fn new(dist: f64, prop: &Prop, propa: &PropA) -> Self {
        let gme = prop.gme;
        let [dl0, dl1] = prop.dl;
        let [rch0, rch1] = prop.rch;
        let curved = |run: f64, rise: f64| (run * run + rise * rise).sqrt() + gme * run;

        let dsl = (dist - propa.dla).max(0.0);
        let toh = prop.hht - (rch0 - dl0 * ((rch1 - rch0) / prop.dist));
        let roh = prop.hhr - (rch0 - (prop.dist - dl1) * ((rch1 - rch0) / prop.dist));
        let toho = prop.hht - (rch0 - (dl0 + dsl) * ((prop.hhr - rch0) / (prop.dist - dl1)));
        let roho = prop.hhr - (prop.hht - dsl * ((rch1 - prop.hht) / dsl));
        let span = prop.dist - propa.dla;

        Self {
            dto: curved(dl0, toh),
            dto1: curved(dl0, toho),
            dtro: curved(dl0 + dsl, prop.hhr),
            drto: curved(dl1 + dsl, prop.hht),
            dro: curved(dl1, roh),
            dro2: curved(dl1, roho),
            dtr: curved(prop.dist, rch0 - rch1),
            dhh1: curved(span, toho),
            dhh2: curved(span, roho),
            dtof: curved(dl0, toh - prop.cch),
            drof: curved(dl1, roh - prop.cch),
        }
    }
}

/// ITWOM diffraction attenuation at `dist`.
///
/// Knife-edge treatment of one or two obstacles with hilltop foliage
/// scatter and clutter loss past the last obstacle. Leaves `prop.tgh`
/// and `prop.tsgh` describing the obstacle as the new source.
#[allow(clippy::too_many_lines)]
pub(crate) fn adiff2(dist: f64, prop: &mut Prop, propa: &PropA) -> f64 {
    // Foliage scatter factor for two obstacles.
    const SF2: f64 = 1.0;
    const TREE_LINE: f64 = 3400.0;

    let g = Geometry::new(dist, prop, propa);
    let ds = dist - propa.dla;

    prop.tgh = prop.cch + 1.0;
    prop.tsgh = prop.hhr;
    let rd = prop.dl[1];

    let knife = |vv: f64, obstacle: f64| {
        if obstacle < TREE_LINE {
            -18.0 + SF2 * aknfe(vv)
        } else {
            aknfe(vv)
        }
    };

    if ds.trunc() > 0.0 {
        // Two obstacles.
        if prop.dl[1].trunc() > 0.0 {
            let q = 0.6365 * prop.wn;
            let mut vv = q * (g.dto1 + g.dhh1 - g.dtro).abs();
            let mut adiffv2 = knife(vv, prop.hht);

            if prop.the[1] < 0.2 {
                vv = q * (g.dro2 + g.dhh2 - g.drto).abs();
                adiffv2 += knife(vv, prop.hhr);
                adiffv2 + saalos(rd, prop).min(22.0)
            } else if prop.the[1] < 1.22 {
                // Past the second peak, into foliage downhill.
                if prop.the[1] > 0.6 {
                    prop.tgh = prop.cch;
                } else {
                    vv = 0.6365 * prop.wn * (g.dro2 + g.dhh2 - g.drto).abs();
                }
                adiffv2 += aknfe(vv);
                adiffv2 + saalos(rd, prop).min(22.0)
            } else {
                // Bare cliff or building face.
                5.8 + 25.0
            }
        } else {
            // Receiver on top of the second peak.
            let vv = 0.6365 * prop.wn * (g.dto + g.dro - g.dtr).abs();
            5.8 + aknfe(vv)
        }
    } else if prop.dl[1].trunc() > 0.0 {
        // One obstacle, receiver past it.
        if prop.the[1] < 0.2 {
            let vv = 0.6365 * prop.wn * (g.dto + g.dro - g.dtr).abs();
            let adiffv2 = if prop.hht < TREE_LINE {
                foliage_edge(vv, &g, prop.wn)
            } else {
                aknfe(vv)
            };
            adiffv2 + saalos(rd, prop).min(22.0)
        } else if prop.the[1] < 1.22 {
            let mut adiffv2 = 0.0;
            if prop.the[1] > 0.6 {
                prop.tgh = prop.cch;
            } else {
                let vv = 0.6365 * prop.wn * (g.dto + g.dro - g.dtr).abs();
                adiffv2 = aknfe(vv);
            }
            adiffv2 + saalos(rd, prop).min(22.0)
        } else {
            5.8 + 25.0
        }
    } else {
        // Receiver on top of the first peak.
        5.8
    }
}

/// Single knife edge below the tree line: the knife-edge field and the
/// field scattered from the foliage on top add with their relative
/// phase.
fn foliage_edge(vv: f64, g: &Geometry, wn: f64) -> f64 {
    let sdl = 10f64.powf(-18.0 / 20.0);
    let kedr = 0.159_155 * wn * (g.dto + g.dro - g.dtr).abs();
    let arp = (kedr - kedr.trunc()).abs();
    let kem = 10f64.powf(-aknfe(vv) / 20.0);
    let sdr = 0.5 + 0.159_155 * wn * (g.dtof + g.drof - g.dtr).abs();
    let srp = (sdr - sdr.trunc()).abs();

    // Phase difference folded into [0, pi].
    let mut pd = 6.283_185_307 * (srp - arp).abs();
    let sign = if pd >= 3.141_592_654 {
        pd = 6.283_185_307 - pd;
        -1.0
    } else {
        1.0
    };
    let re = sdl + sign * kem * pd.cos();
    let im = sign * kem * pd.sin();
    let csd = re * re + im * im;
    -3.71 - 10.0 * csd.log10()
}
