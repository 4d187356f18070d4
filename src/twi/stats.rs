//! Reductions of per-vertex samples to a single per-streamline value.
//!
//! Non-finite samples are ignored; a reduction over no finite samples is NaN.

use ordered_float::NotNan;

use crate::types::{Point, Weightf32};

/// Length associated with each vertex: half of each adjacent segment. A
/// single vertex gets unit weight.
pub fn vertex_weights(points: &[Point]) -> Vec<Weightf32> {
    let n = points.len();
    if n < 2 { return vec![1.0; n] }
    let segments: Vec<f32> = points.windows(2).map(|w| (w[1] - w[0]).norm()).collect();
    (0..n).map(|i| {
        let before = if i > 0     { segments[i - 1] } else { 0.0 };
        let after  = if i < n - 1 { segments[i]     } else { 0.0 };
        0.5 * (before + after)
    }).collect()
}

fn finite(values: &[f32]) -> impl Iterator<Item = f32> + '_ {
    values.iter().cloned().filter(|v| v.is_finite())
}

fn finite_weighted<'a>(values: &'a [f32], weights: &'a [Weightf32]) -> impl Iterator<Item = (f32, f32)> + 'a {
    values.iter().cloned().zip(weights.iter().cloned())
        .filter(|(v, w)| v.is_finite() && w.is_finite())
}

pub fn sum(values: &[f32]) -> f32 {
    finite(values).fold(None, |acc: Option<f32>, v| Some(acc.unwrap_or(0.0) + v)).unwrap_or(f32::NAN)
}

pub fn min(values: &[f32]) -> f32 { finite(values).reduce(f32::min).unwrap_or(f32::NAN) }
pub fn max(values: &[f32]) -> f32 { finite(values).reduce(f32::max).unwrap_or(f32::NAN) }

/// Length-weighted mean over finite samples. If all weights vanish, the
/// plain mean.
pub fn weighted_mean(values: &[f32], weights: &[Weightf32]) -> f32 {
    let (mut total, mut weight, mut plain, mut count) = (0.0_f64, 0.0_f64, 0.0_f64, 0_usize);
    for (v, w) in finite_weighted(values, weights) {
        total  += (v * w) as f64;
        weight += w as f64;
        plain  += v as f64;
        count  += 1;
    }
    if count == 0   { f32::NAN }
    else if weight > 0.0 { (total / weight) as f32 }
    else                 { (plain / count as f64) as f32 }
}

/// Length-weighted median: sorted samples are accumulated until their weight
/// exceeds half of the total.
pub fn weighted_median(values: &[f32], weights: &[Weightf32]) -> f32 {
    let mut samples: Vec<(NotNan<f32>, f32)> = finite_weighted(values, weights)
        .filter_map(|(v, w)| NotNan::new(v).ok().map(|v| (v, w)))
        .collect();
    if samples.is_empty() { return f32::NAN }
    samples.sort_by_key(|(v, _)| *v);
    let mut total: f32 = samples.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        samples.iter_mut().for_each(|s| s.1 = 1.0);
        total = samples.len() as f32;
    }
    let half = 0.5 * total;
    let mut accumulated = 0.0;
    for (v, w) in &samples {
        accumulated += w;
        if accumulated > half { return v.into_inner() }
    }
    samples[samples.len() - 1].0.into_inner()
}

/// Pearson correlation coefficient. NaN if either series is constant or the
/// lengths differ.
pub fn pearson(a: &[f32], b: &[f32]) -> f32 {
    weighted_pearson(a, b, &vec![1.0; a.len()])
}

pub fn weighted_pearson(a: &[f32], b: &[f32], w: &[Weightf32]) -> f32 {
    if a.len() != b.len() || a.len() != w.len() || a.is_empty() { return f32::NAN }
    let total: f64 = w.iter().map(|&w| w as f64).sum();
    if !(total > 0.0) { return f32::NAN }
    let mean = |x: &[f32]| x.iter().zip(w).map(|(&x, &w)| x as f64 * w as f64).sum::<f64>() / total;
    let (ma, mb) = (mean(a), mean(b));
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for ((&x, &y), &w) in a.iter().zip(b).zip(w) {
        let (dx, dy, w) = (x as f64 - ma, y as f64 - mb, w as f64);
        cov += w * dx * dy;
        va  += w * dx * dx;
        vb  += w * dy * dy;
    }
    if !(va > 0.0 && vb > 0.0) { return f32::NAN }
    (cov / (va * vb).sqrt()).clamp(-1.0, 1.0) as f32
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;

    fn straight(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn trapezoid_weights() {
        assert_eq!(vertex_weights(&straight(5)), vec![0.5, 1.0, 1.0, 1.0, 0.5]);
        assert_eq!(vertex_weights(&straight(1)), vec![1.0]);
        assert_eq!(vertex_weights(&[]), Vec::<f32>::new());
    }

    #[test]
    fn median_of_evenly_spaced_samples() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(weighted_median(&values, &vertex_weights(&straight(5))), 3.0);
        // Order of the samples is irrelevant
        assert_eq!(weighted_median(&[5.0, 1.0, 4.0, 2.0, 3.0], &[1.0; 5]), 3.0);
    }

    #[test]
    fn median_follows_weight() {
        assert_eq!(weighted_median(&[1.0, 2.0, 3.0], &[0.1, 0.1, 5.0]), 3.0);
        assert_eq!(weighted_median(&[1.0, f32::NAN, 3.0], &[3.0, 10.0, 1.0]), 1.0);
    }

    #[rstest(/**/       values         ,  sum,  min,  max, mean,
             case(vec![1.0, 2.0, 6.0]  ,  9.0,  1.0,  6.0,  3.0),
             case(vec![f32::NAN, 4.0]  ,  4.0,  4.0,  4.0,  4.0),
             case(vec![-1.0, f32::INFINITY, 1.0], 0.0, -1.0, 1.0, 0.0),
    )]
    fn simple_reductions(values: Vec<f32>, sum: f32, min: f32, max: f32, mean: f32) {
        let weights = vec![1.0; values.len()];
        assert_eq!(super::sum(&values), sum);
        assert_eq!(super::min(&values), min);
        assert_eq!(super::max(&values), max);
        assert_float_eq!(weighted_mean(&values, &weights), mean, ulps <= 1);
    }

    #[test]
    fn nothing_finite_gives_nan() {
        let values = [f32::NAN, f32::NEG_INFINITY];
        let weights = [1.0, 1.0];
        assert!(sum(&values).is_nan());
        assert!(min(&values).is_nan());
        assert!(max(&values).is_nan());
        assert!(weighted_mean(&values, &weights).is_nan());
        assert!(weighted_median(&values, &weights).is_nan());
    }

    #[test]
    fn weighted_mean_uses_lengths() {
        assert_float_eq!(weighted_mean(&[1.0, 4.0], &[3.0, 1.0]), 1.75, ulps <= 1);
    }

    #[test]
    fn correlation_extremes() {
        let a = [1.0, 3.0, 2.0, 5.0, 4.0];
        let b: Vec<f32> = a.iter().map(|x| 2.0 * x + 1.0).collect();
        let c: Vec<f32> = a.iter().map(|x| -x).collect();
        assert_float_eq!(pearson(&a, &a), 1.0, abs <= 1e-6);
        assert_float_eq!(pearson(&a, &b), 1.0, abs <= 1e-6);
        assert_float_eq!(pearson(&a, &c), -1.0, abs <= 1e-6);
        assert!(pearson(&a, &[1.0; 5]).is_nan());
        assert!(pearson(&a, &a[..4]).is_nan());
    }

    #[test]
    fn weights_restrict_correlation() {
        // Agree where weighted, disagree where not
        let a = [1.0, 2.0, 3.0, 10.0];
        let b = [1.0, 2.0, 3.0, -10.0];
        let w = [1.0, 1.0, 1.0, 0.0];
        assert_float_eq!(weighted_pearson(&a, &b, &w), 1.0, abs <= 1e-6);
        assert!(pearson(&a, &b) < 0.0);
    }
}
