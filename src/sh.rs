//! Real, antipodally symmetric spherical harmonics.
//!
//! Only even degrees are used. Coefficients of degree `l` and order `m` live
//! at index `l(l+1)/2 + m` (`-l <= m <= l`), so a series of maximum degree
//! `lmax` has `(lmax+1)(lmax+2)/2` coefficients. The basis is orthonormal over
//! the sphere:
//!
//! + `m > 0`: `sqrt(2) N P_l^m(cos theta) cos(m phi)`
//! + `m = 0`: `N P_l^0(cos theta)`
//! + `m < 0`: `sqrt(2) N P_l^|m|(cos theta) sin(|m| phi)`

use std::f64::consts::PI;

use crate::types::Vector;

/// Number of coefficients in an even-degree series up to `lmax`
pub fn n_for_l(lmax: usize) -> usize { (lmax + 1) * (lmax + 2) / 2 }

/// Maximum degree of an even-degree series with `n` coefficients, if `n` is a
/// valid series length
pub fn l_for_n(n: usize) -> Option<usize> {
    (0..).step_by(2)
        .map(|l| (l, n_for_l(l)))
        .take_while(|&(_, count)| count <= n)
        .find(|&(_, count)| count == n)
        .map(|(l, _)| l)
}

#[inline]
pub fn index(l: usize, m: isize) -> usize { ((l * (l + 1) / 2) as isize + m) as usize }

/// Fully normalized associated Legendre functions `N P_l^m(x)` (including the
/// `1/4pi` factor, without the Condon-Shortley phase) for all `l <= lmax` and
/// `0 <= m <= l`, stored at `l(l+1)/2 + m`.
fn legendre_table(lmax: usize, x: f64) -> Vec<f64> {
    let x = x.clamp(-1.0, 1.0);
    let s = (1.0 - x * x).sqrt();
    let at = |l: usize, m: usize| l * (l + 1) / 2 + m;
    let mut p = vec![0.0; (lmax + 1) * (lmax + 2) / 2];
    p[0] = (0.25 / PI).sqrt();
    for m in 0..=lmax {
        if m > 0 {
            let mf = m as f64;
            p[at(m, m)] = ((2.0 * mf + 1.0) / (2.0 * mf)).sqrt() * s * p[at(m - 1, m - 1)];
        }
        if m < lmax {
            p[at(m + 1, m)] = (2.0 * m as f64 + 3.0).sqrt() * x * p[at(m, m)];
        }
        for l in (m + 2)..=lmax {
            let (lf, mf) = (l as f64, m as f64);
            let a = ((4.0 * lf * lf - 1.0) / (lf * lf - mf * mf)).sqrt();
            let b = (((lf - 1.0).powi(2) - mf * mf) / (4.0 * (lf - 1.0).powi(2) - 1.0)).sqrt();
            p[at(l, m)] = a * (x * p[at(l - 1, m)] - b * p[at(l - 2, m)]);
        }
    }
    p
}

/// Evaluate every even-degree basis function up to `lmax` along `dir` (which
/// need not be normalized).
pub fn basis(lmax: usize, dir: &Vector) -> Vec<f32> {
    let (x, y, z) = (dir.x as f64, dir.y as f64, dir.z as f64);
    let r = (x * x + y * y + z * z).sqrt();
    let cos_theta = if r > 0.0 { z / r } else { 1.0 };
    let phi = y.atan2(x);
    let legendre = legendre_table(lmax, cos_theta);
    let mut out = vec![0.0; n_for_l(lmax)];
    for l in (0..=lmax).step_by(2) {
        let base = l * (l + 1) / 2;
        out[index(l, 0)] = legendre[base] as f32;
        for m in 1..=l {
            let p = std::f64::consts::SQRT_2 * legendre[base + m];
            let mphi = m as f64 * phi;
            out[index(l, m as isize)]  = (p * mphi.cos()) as f32;
            out[index(l, -(m as isize))] = (p * mphi.sin()) as f32;
        }
    }
    out
}

/// Amplitude of an SH series along `dir`
pub fn value(coefs: &[f32], dir: &Vector) -> f32 {
    let Some(lmax) = l_for_n(coefs.len()) else { return f32::NAN };
    basis(lmax, dir).iter().zip(coefs).map(|(b, c)| b * c).sum()
}


/// Associated Legendre functions tabulated over the polar angle, for fast
/// amplitude evaluation of many series along many directions. Values between
/// table nodes are linearly interpolated.
#[derive(Clone, Debug)]
pub struct PrecomputedAL {
    lmax: usize,
    // number of intervals over [0, pi]
    intervals: usize,
    // even degrees and non-negative orders only, at l^2/4 + m
    table: Vec<f32>,
}

impl PrecomputedAL {
    pub const DEFAULT_INTERVALS: usize = 256;

    pub fn new(lmax: usize) -> Self { Self::with_intervals(lmax, Self::DEFAULT_INTERVALS) }

    pub fn with_intervals(lmax: usize, intervals: usize) -> Self {
        let lmax = lmax & !1;
        let intervals = intervals.max(1);
        let stride = Self::stride(lmax);
        let mut table = Vec::with_capacity(stride * (intervals + 1));
        for k in 0..=intervals {
            let theta = PI * k as f64 / intervals as f64;
            let legendre = legendre_table(lmax, theta.cos());
            for l in (0..=lmax).step_by(2) {
                for m in 0..=l {
                    let norm = if m == 0 { 1.0 } else { std::f64::consts::SQRT_2 };
                    table.push((norm * legendre[l * (l + 1) / 2 + m]) as f32);
                }
            }
        }
        Self { lmax, intervals, table }
    }

    pub fn lmax(&self) -> usize { self.lmax }

    fn stride(lmax: usize) -> usize { (lmax / 2 + 1).pow(2) }

    /// Amplitude of `coefs` along `dir`, which must be a unit vector. Only
    /// the coefficients up to the table's `lmax` are used.
    pub fn value(&self, coefs: &[f32], dir: &Vector) -> f32 {
        let stride = Self::stride(self.lmax);
        let cos_theta = dir.z.clamp(-1.0, 1.0);
        let position = cos_theta.acos() / std::f32::consts::PI * self.intervals as f32;
        let k = (position.floor() as usize).min(self.intervals - 1);
        let f = position - k as f32;
        let row = |k: usize| &self.table[k * stride..(k + 1) * stride];
        let (lo, hi) = (row(k), row(k + 1));
        let phi = dir.y.atan2(dir.x);

        let mut amplitude = 0.0;
        let mut al = 0;
        for l in (0..=self.lmax).step_by(2) {
            if index(l, l as isize) >= coefs.len() { break }
            let p = |al: usize| lo[al] + f * (hi[al] - lo[al]);
            amplitude += coefs[index(l, 0)] * p(al);
            for m in 1..=l {
                let mphi = m as f32 * phi;
                amplitude += p(al + m) * (coefs[index(l, m as isize)]    * mphi.cos()
                                        + coefs[index(l, -(m as isize))] * mphi.sin());
            }
            al += l + 1;
        }
        amplitude
    }
}


/// Apodized point spread function: the SH series of a smoothed delta function
/// along a given direction, scaled to unit amplitude along that direction.
#[derive(Clone, Debug)]
pub struct Apsf {
    lmax: usize,
    // per even degree: apodization times overall scale
    degree_weights: Vec<f32>,
}

impl Apsf {
    pub fn new(lmax: usize) -> Self {
        let lmax = lmax & !1;
        let apodization = |l: usize| 0.5 * (1.0 + (PI * l as f64 / (lmax + 2) as f64).cos());
        // Addition theorem: sum over m of Y_lm(d)^2 is (2l+1)/4pi for any d
        let peak: f64 = (0..=lmax).step_by(2)
            .map(|l| apodization(l) * (2 * l + 1) as f64 / (4.0 * PI))
            .sum();
        let degree_weights = (0..=lmax).step_by(2)
            .map(|l| (apodization(l) / peak) as f32)
            .collect();
        Self { lmax, degree_weights }
    }

    pub fn lmax(&self) -> usize { self.lmax }

    pub fn n_coefs(&self) -> usize { n_for_l(self.lmax) }

    pub fn coefficients(&self, dir: &Vector) -> Vec<f32> {
        let mut coefs = basis(self.lmax, dir);
        for (j, w) in self.degree_weights.iter().enumerate() {
            let l = 2 * j;
            for c in &mut coefs[index(l, -(l as isize))..=index(l, l as isize)] {
                *c *= w;
            }
        }
        coefs
    }
}
