//! Tropospheric scatter attenuation.

use crate::{
    math::{ahd, fdim, h0f},
    state::{Prop, PropA},
};

/// Returned when both terminals are too low for scatter to matter.
pub(crate) const NO_SCATTER: f64 = 1001.0;

/// Scatter evaluation state for one path.
///
/// The frequency gain found on the first call is reused by later
/// calls once it exceeds 15 dB.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scatter {
    ad: f64,
    rr: f64,
    etq: f64,
    h0s: f64,
}

impl Scatter {
    pub(crate) fn new(prop: &Prop) -> Self {
        let mut ad = prop.dl[0] - prop.dl[1];
        let mut rr = prop.he[1] / prop.rch[0];
        if ad < 0.0 {
            ad = -ad;
            rr = 1.0 / rr;
        }
        Self {
            ad,
            rr,
            etq: (5.67e-6 * prop.ens - 2.32e-3) * prop.ens + 0.031,
            h0s: -15.0,
        }
    }

    /// Scatter attenuation at `dist`.
    pub(crate) fn ascat(&mut self, dist: f64, prop: &Prop, propa: &PropA) -> f64 {
        let h0 = if self.h0s > 15.0 {
            self.h0s
        } else {
            let th = prop.the[0] + prop.the[1] + dist * prop.gme;
            let r = 2.0 * prop.wn * th;
            let r1 = r * prop.he[0];
            let r2 = r * prop.he[1];
            if r1 < 0.2 && r2 < 0.2 {
                return NO_SCATTER;
            }

            let ss = (dist - self.ad) / (dist + self.ad);
            let q = (self.rr / ss).max(0.1).min(10.0);
            let ss = ss.max(0.1);
            let z0 = (dist - self.ad) * (dist + self.ad) * th * 0.25 / dist;
            let et = (self.etq * (-(z0 / 8.0e3).min(1.7).powi(6)).exp() + 1.0) * z0 / 1.7556e3;

            let ett = et.max(1.0);
            let mut h0 = (h0f(r1, ett) + h0f(r2, ett)) * 0.5;
            h0 += h0.min((1.38 - ett.ln()) * ss.ln() * q.ln() * 0.49);
            h0 = fdim(h0, 0.0);

            if et < 1.0 {
                let gain = (1.0 + 1.4142 / r1) * (1.0 + 1.4142 / r2);
                h0 = et * h0
                    + (1.0 - et) * 4.343 * ((gain * gain) * (r1 + r2) / (r1 + r2 + 2.8284)).ln();
            }

            if h0 > 15.0 && self.h0s >= 0.0 {
                self.h0s
            } else {
                h0
            }
        };

        self.h0s = h0;
        let th = propa.tha + dist * prop.gme;
        ahd(th * dist) + 4.343 * (47.7 * prop.wn * th.powi(4)).ln()
            - 0.1 * (prop.ens - 301.0) * (-th * dist / 40e3).exp()
            + h0
    }
}
