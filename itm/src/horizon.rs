//! Profile analysis: horizons, terrain irregularity and line fits.
//!
//! All functions take the packed profile `pfl`, where `pfl[0]` is
//! the number of intervals, `pfl[1]` the spacing in meters, and
//! `pfl[2..]` the elevations.

use crate::{math::fdim, state::Prop};

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn intervals(pfl: &[f64]) -> usize {
    pfl[0] as usize
}

/// Finds the horizon angles and distances for both terminals.
///
/// Longley-Rice flavor: elevation angles are plain slopes.
pub(crate) fn hzns(pfl: &[f64], prop: &mut Prop) {
    let np = intervals(pfl);
    let xi = pfl[1];
    let za = pfl[2] + prop.hg[0];
    let zb = pfl[np + 2] + prop.hg[1];
    let qc = 0.5 * prop.gme;
    let q = qc * prop.dist;

    let slope = (zb - za) / prop.dist;
    prop.the[0] = slope - q;
    prop.the[1] = -slope - q;
    prop.dl = [prop.dist, prop.dist];

    if np < 2 {
        return;
    }

    let mut sa = 0.0;
    let mut sb = prop.dist;
    let mut wq = true;
    for i in 1..np {
        sa += xi;
        sb -= xi;
        let q = pfl[i + 2] - (qc * sa + prop.the[0]) * sa - za;
        if q > 0.0 {
            prop.the[0] += q / sa;
            prop.dl[0] = sa;
            wq = false;
        }
        if !wq {
            let q = pfl[i + 2] - (qc * sb + prop.the[1]) * sb - zb;
            if q > 0.0 {
                prop.the[1] += q / sb;
                prop.dl[1] = sb;
            }
        }
    }
}

/// Finds horizons, obstacle heights and the two-ray reflection point.
///
/// ITWOM flavor: angles use `atan`, and the rx side is scanned
/// independently once the path is known to be obstructed.
pub(crate) fn hzns2(pfl: &[f64], prop: &mut Prop) {
    let np = intervals(pfl);
    let xi = pfl[1];
    let za = pfl[2] + prop.hg[0];
    let zb = pfl[np + 2] + prop.hg[1];

    prop.tiw = xi;
    prop.ght = za;
    prop.ghr = zb;

    let qc = 0.5 * prop.gme;
    let q = qc * prop.dist;
    let slope = ((zb - za) / prop.dist).atan();
    prop.the[0] = slope - q;
    prop.the[1] = -slope - q;
    prop.dl = [prop.dist, prop.dist];
    prop.hht = 0.0;
    prop.hhr = 0.0;
    prop.los = true;

    if np >= 2 {
        let mut sa = 0.0;
        let mut sb = prop.dist;
        let mut wq = true;

        for j in 1..np {
            sa += xi;
            let q = pfl[j + 2] - (qc * sa + prop.the[0]) * sa - za;
            if q > 0.0 {
                prop.los = false;
                prop.the[0] += q / sa;
                prop.dl[0] = sa;
                prop.the[0] = prop.the[0].min(1.569);
                prop.hht = pfl[j + 2];
                wq = false;
            }
        }

        if !wq {
            for i in 1..np {
                sb -= xi;
                let ds = prop.dist - sb;
                let q = pfl[np + 2 - i] - (qc * ds + prop.the[1]) * ds - zb;
                if q > 0.0 {
                    prop.the[1] += q / ds;
                    prop.the[1] = prop.the[1].min(1.57).max(-1.568);
                    prop.hhr = pfl[np + 2 - i];
                    prop.dl[1] = ds.max(0.0);
                }
            }

            prop.the[0] = ((prop.hht - za) / prop.dl[0]).atan() - 0.5 * prop.gme * prop.dl[0];
            prop.the[1] = ((prop.hhr - zb) / prop.dl[1]).atan() - 0.5 * prop.gme * prop.dl[1];
        }
    }

    // Distance from the last obstruction to the reflection point.
    let mut dr = 0.0;
    if prop.dl[1] < prop.dist {
        let dshh = prop.dist - prop.dl[0] - prop.dl[1];
        if dshh.trunc() == 0.0 {
            if prop.hht > 0.0 {
                dr = prop.dl[1] / (1.0 + zb / prop.hht);
            }
        } else if prop.hhr > 0.0 {
            dr = prop.dl[1] / (1.0 + zb / prop.hhr);
        }
    } else if za > 0.0 {
        dr = prop.dist / (1.0 + zb / za);
    }

    // Keep the reflection point on the profile even for odd geometry.
    #[allow(clippy::cast_possible_truncation)]
    let offset = (0.5 + dr / xi).floor() as i64;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    let rp = (2 + offset).clamp(2, np as i64 + 2) as usize;
    prop.rph = pfl[rp];
}

/// Linear least-squares fit of `z` between `x1` and `x2`.
///
/// Longley-Rice flavor, slope normalization included. Returns the
/// fitted heights at both ends of the profile.
pub(crate) fn z1sq1(z: &[f64], x1: f64, x2: f64) -> (f64, f64) {
    let xn = z[0];
    let mut xa = fdim(x1 / z[1], 0.0).trunc();
    let mut xb = xn - fdim(xn, x2 / z[1]).trunc();
    if xb <= xa {
        xa = fdim(xa, 1.0);
        xb = xn - fdim(xn, xb + 1.0);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (mut ja, jb) = (xa as usize, xb as usize);
    let n = jb.saturating_sub(ja);
    let xa = xb - xa;
    let mut x = -0.5 * xa;
    let xb = xb + x;

    let mut a = 0.5 * (z[ja + 2] + z[jb + 2]);
    let mut b = 0.5 * (z[ja + 2] - z[jb + 2]) * x;
    for _ in 2..=n {
        ja += 1;
        x += 1.0;
        a += z[ja + 2];
        b += z[ja + 2] * x;
    }

    let a = a / xa;
    let b = b * 12.0 / ((xa * xa + 2.0) * xa);
    (a - b * xb, a + b * (xn - xb))
}

/// Linear least-squares fit of `z` between `x1` and `x2`.
///
/// ITWOM flavor: fits over an odd interval count centered on a zero
/// crossing. Returns the fitted heights at both ends of the profile.
pub(crate) fn z1sq2(z: &[f64], x1: f64, x2: f64) -> (f64, f64) {
    let xn = z[0];
    let mut xa = fdim(x1 / z[1], 0.0).trunc();
    let mut xb = xn - fdim(xn, x2 / z[1]).trunc();
    if xb <= xa {
        xa = fdim(xa, 1.0);
        xb = xn - fdim(xn, xb + 1.0);
    }

    #[allow(clippy::cast_possible_truncation)]
    let jb = xb as i64;
    let xa = 2.0 * ((xb - xa) / 2.0).trunc() - 1.0;
    let mut x = -0.5 * (xa + 1.0);
    let xb = xb + x;
    #[allow(clippy::cast_possible_truncation)]
    let mut ja = (jb - 1 - xa as i64).max(0);
    let n = jb - ja;

    #[allow(clippy::cast_sign_loss)]
    let at = |j: i64| z[j as usize + 2];

    let mut a = at(ja) + at(jb);
    let mut b = (at(ja) - at(jb)) * x;
    let mut bn = 2.0 * (x * x);
    for _ in 2..=n {
        ja += 1;
        x += 1.0;
        bn += x * x;
        a += at(ja);
        b += at(ja) * x;
    }

    let a = a / (xa + 2.0);
    let b = b / bn;
    (a - b * xb, a + b * (xn - xb))
}

/// Partially orders `a` in descending order and returns the value
/// that would sit at index `ir` if it were fully sorted.
///
/// Hoare-partition quickselect over `a[0..=nn]`. The rank is capped
/// at `nn - 1`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub(crate) fn qtile(nn: usize, a: &mut [f64], ir: usize) -> f64 {
    let mut n = nn as isize;
    let mut m: isize = 0;
    let k = (ir as isize).min(n - 1).max(0);

    let mut q = 0.0;
    let mut i0 = 0;
    let mut j1 = 0;
    let mut restart = true;

    loop {
        if restart {
            q = a[k as usize];
            i0 = m;
            j1 = n;
        }

        let mut i = i0;
        while i <= n && a[i as usize] >= q {
            i += 1;
        }
        if i > n {
            i = n;
        }

        let mut j = j1;
        while j >= m && a[j as usize] <= q {
            j -= 1;
        }
        if j < m {
            j = m;
        }

        if i < j {
            a.swap(i as usize, j as usize);
            i0 = i + 1;
            j1 = j - 1;
            restart = false;
        } else if i < k {
            a[k as usize] = a[i as usize];
            a[i as usize] = q;
            m = i + 1;
            restart = true;
        } else if j > k {
            a[k as usize] = a[j as usize];
            a[j as usize] = q;
            n = j - 1;
            restart = true;
        } else {
            break;
        }
    }
    q
}

/// Which decile budget [`delta_h`] works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deciles {
    /// At most 25 deciles (245 resampled points).
    Capped,
    /// Grows with the profile, `max(25, 83350 / spacing)`.
    Dynamic,
}

/// Terrain irregularity: interdecile range of the profile between
/// `x1` and `x2` (meters from the tx) after removing a linear trend.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub(crate) fn delta_h(pfl: &[f64], x1: f64, x2: f64, deciles: Deciles) -> f64 {
    let np = intervals(pfl);
    let xa = x1 / pfl[1];
    let xb = x2 / pfl[1];
    if xb - xa < 2.0 {
        return 0.0;
    }
    let ka = (0.1 * (xb - xa + 8.0)) as i64;
    let kmx = match deciles {
        Deciles::Capped => 25,
        Deciles::Dynamic => 25.max((83350.0 / pfl[1]) as i64),
    };
    let ka = ka.max(4).min(kmx);
    let n = 10 * ka - 5;
    let kb = n - ka + 1;
    let sn = (n - 1) as f64;
    let (n, ka, kb) = (n as usize, ka as usize, kb as usize);

    let mut s = vec![0.0; n + 2];
    s[0] = sn;
    s[1] = 1.0;

    let step = (xb - xa) / sn;
    let mut k = (xa + 1.0).trunc().max(0.0) as usize;
    let mut xc = xa - k as f64;

    for j in 0..n {
        while xc > 0.0 && k < np {
            xc -= 1.0;
            k += 1;
        }
        // k == 0 reads the spacing slot here.
        s[j + 2] = pfl[k + 2] + (pfl[k + 2] - pfl[k + 1]) * xc;
        xc += step;
    }

    let (mut za, zb) = match deciles {
        Deciles::Capped => z1sq1(&s, 0.0, sn),
        Deciles::Dynamic => z1sq2(&s, 0.0, sn),
    };
    let slope = (zb - za) / sn;
    for v in &mut s[2..] {
        *v -= za;
        za += slope;
    }

    let samples = &mut s[2..];
    let upper = qtile(n - 1, samples, ka - 1);
    let lower = qtile(n - 1, samples, kb - 1);
    (upper - lower) / (1.0 - 0.8 * (-(x2 - x1) / 50.0e3).exp())
}
