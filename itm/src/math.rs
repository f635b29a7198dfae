//! Closed-form helpers shared by the loss calculations.

/// FORTRAN's `DIM`: positive difference of `x` and `y`.
pub(crate) fn fdim(x: f64, y: f64) -> f64 {
    if x > y {
        x - y
    } else {
        0.0
    }
}

/// Knife-edge diffraction attenuation for the squared wedge
/// parameter `v2`.
pub(crate) fn aknfe(v2: f64) -> f64 {
    if v2 < 5.76 {
        6.02 + 9.11 * v2.sqrt() - 1.27 * v2
    } else {
        12.953 + 10.0 * v2.log10()
    }
}

/// Height-gain over a smooth spherical earth.
pub(crate) fn fht(x: f64, pk: f64) -> f64 {
    if x < 200.0 {
        let w = -pk.ln();
        if pk < 1.0e-5 || x * w * w * w > 5495.0 {
            if x > 1.0 {
                40.0 * x.log10() - 117.0
            } else {
                -117.0
            }
        } else {
            2.5e-5 * x * x / pk - 8.686 * w - 15.0
        }
    } else {
        let fhtv = 0.05751 * x - 10.0 * x.log10();
        if x < 2000.0 {
            let w = 0.0134 * x * (-0.005 * x).exp();
            (1.0 - w) * fhtv + w * (40.0 * x.log10() - 117.0)
        } else {
            fhtv
        }
    }
}

/// Frequency gain for scatter fields.
///
/// `r` is twice the angular distance, `et` the scatter efficiency.
pub(crate) fn h0f(r: f64, et: f64) -> f64 {
    const A: [f64; 5] = [25.0, 80.0, 177.0, 395.0, 705.0];
    const B: [f64; 5] = [24.0, 45.0, 68.0, 80.0, 105.0];

    #[allow(clippy::cast_possible_truncation)]
    let it = et as i32;
    let (it, q) = if it <= 0 {
        (1, 0.0)
    } else if it >= 5 {
        (5, 0.0)
    } else {
        (it, et - f64::from(it))
    };
    #[allow(clippy::cast_sign_loss)]
    let it = it as usize;

    let x = (1.0 / r) * (1.0 / r);
    let h0fv = 4.343 * ((A[it - 1] * x + B[it - 1]) * x + 1.0).ln();
    if q == 0.0 {
        h0fv
    } else {
        (1.0 - q) * h0fv + q * 4.343 * ((A[it] * x + B[it]) * x + 1.0).ln()
    }
}

/// Approximate theta-d function for scatter fields.
pub(crate) fn ahd(td: f64) -> f64 {
    const A: [f64; 3] = [133.4, 104.6, 71.8];
    const B: [f64; 3] = [0.332e-3, 0.212e-3, 0.157e-3];
    const C: [f64; 3] = [-4.343, -1.086, 2.171];

    let i = if td <= 10e3 {
        0
    } else if td <= 70e3 {
        1
    } else {
        2
    };
    A[i] + B[i] * td + C[i] * td.ln()
}

/// Standard normal complementary probability.
pub fn qerf(z: f64) -> f64 {
    const B1: f64 = 0.319_381_530;
    const B2: f64 = -0.356_563_782;
    const B3: f64 = 1.781_477_937;
    const B4: f64 = -1.821_255_987;
    const B5: f64 = 1.330_274_429;
    const RP: f64 = 4.317_008;
    const RRT2PI: f64 = 0.398_942_280;

    let t = z.abs();
    let qerfv = if t >= 10.0 {
        0.0
    } else {
        let t = RP / (t + RP);
        (-0.5 * z * z).exp() * RRT2PI * ((((B5 * t + B4) * t + B3) * t + B2) * t + B1) * t
    };
    if z < 0.0 {
        1.0 - qerfv
    } else {
        qerfv
    }
}

/// Inverse of [`qerf`].
///
/// Probabilities at or beyond 0 and 1 saturate at roughly ±5.
pub fn qerfi(q: f64) -> f64 {
    const C0: f64 = 2.515_516_698;
    const C1: f64 = 0.802_853;
    const C2: f64 = 0.010_328;
    const D1: f64 = 1.432_788;
    const D2: f64 = 0.189_269;
    const D3: f64 = 0.001_308;

    let x = 0.5 - q;
    let t = (0.5 - x.abs()).max(0.000_001);
    let t = (-2.0 * t.ln()).sqrt();
    let v = t - ((C2 * t + C1) * t + C0) / (((D3 * t + D2) * t + D1) * t + 1.0);
    if x < 0.0 {
        -v
    } else {
        v
    }
}

/// Climate curve used by the variability model.
pub(crate) fn curve(c1: f64, c2: f64, x1: f64, x2: f64, x3: f64, de: f64) -> f64 {
    let temp1 = ((de - x2) / x3).powi(2);
    let temp2 = (de / x1).powi(2);
    (c1 + c2 / (1.0 + temp1)) * temp2 / (1.0 + temp2)
}

#[cfg(test)]
mod tests {
    use super::{aknfe, fdim, qerf, qerfi};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fdim() {
        assert_eq!(fdim(3.0, 1.0), 2.0);
        assert_eq!(fdim(1.0, 3.0), 0.0);
    }

    #[test]
    fn test_aknfe_is_continuous_at_breakpoint() {
        let below = aknfe(5.76 - 1e-9);
        let above = aknfe(5.76);
        assert_abs_diff_eq!(below, above, epsilon = 0.05);
    }

    #[test]
    fn test_qerfi_median_is_zero() {
        assert_abs_diff_eq!(qerfi(0.5), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_qerfi_inverts_qerf() {
        for q in [0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99] {
            assert_abs_diff_eq!(qerf(qerfi(q)), q, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_qerfi_saturates() {
        let low = qerfi(0.0);
        let high = qerfi(1.0);
        assert!(low.is_finite() && high.is_finite());
        assert_abs_diff_eq!(low, -high, epsilon = 1e-12);
    }
}
