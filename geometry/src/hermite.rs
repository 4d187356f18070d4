//! Cubic Hermite interpolation along streamlines.
//!
//! A segment between vertices `p[i]` and `p[i+1]` is interpolated using the
//! four control points `p[i-1], p[i], p[i+1], p[i+2]`. The first and last
//! segments lack one of those; `pad_ends` supplies them by reflecting the
//! neighbouring vertex through the end vertex.

use crate::Point;

/// Cubic Hermite weights for a given tension, evaluated at one curve
/// parameter `mu` in `[0, 1]` at a time.
#[derive(Clone, Copy, Debug)]
pub struct Hermite {
    t: f32,
    w: [f32; 4],
}

impl Hermite {

    /// Non-zero `tension` reduces overshoot ("bulging") between control
    /// points. Zero gives the Catmull-Rom spline.
    pub fn new(tension: f32) -> Self {
        let mut h = Self { t: 0.5 * tension, w: [0.0; 4] };
        h.set(0.0);
        h
    }

    /// Place the evaluation point at curve parameter `mu`
    pub fn set(&mut self, mu: f32) {
        let t  = self.t;
        let p2 = mu * mu;
        let p3 = mu * p2;
        self.w = [
            (0.5 - t) * (2.0 * p2 - p3 - mu),
            1.0 + (1.5 + t) * p3 - (2.5 + t) * p2,
            (2.0 + 2.0 * t) * p2 + (0.5 - t) * mu - (1.5 + t) * p3,
            (0.5 - t) * (p3 - p2),
        ];
    }

    pub fn weights(&self) -> [f32; 4] { self.w }

    /// Curve position at the current parameter
    pub fn value(&self, [a, b, c, d]: [&Point; 4]) -> Point {
        let [w0, w1, w2, w3] = self.w;
        Point::from(a.coords * w0 + b.coords * w1 + c.coords * w2 + d.coords * w3)
    }

    /// Convenience: set `mu` and evaluate in one go
    pub fn at(&mut self, mu: f32, control: [&Point; 4]) -> Point {
        self.set(mu);
        self.value(control)
    }
}

/// Extend a polyline by one virtual vertex at each end, obtained by
/// reflecting the second (penultimate) vertex through the first (last).
///
/// Vertex `i` of `points` becomes vertex `i + 1` of the result, so the control
/// points of segment `(i, i+1)` are `padded[i..i+4]`. Polylines with fewer
/// than two points are returned unchanged.
pub fn pad_ends(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 2 { return points.to_vec() }
    let reflect = |end: &Point, next: &Point| -> Point { end + (end - next) };
    let mut padded = Vec::with_capacity(n + 2);
    padded.push(reflect(&points[0], &points[1]));
    padded.extend_from_slice(points);
    padded.push(reflect(&points[n - 1], &points[n - 2]));
    padded
}

/// Increases vertex density of streamlines by inserting `ratio - 1` Hermite
/// interpolated vertices into every segment. The original vertices are kept,
/// at indices which are multiples of `ratio`.
#[derive(Clone, Debug)]
pub struct Upsampler {
    ratio: usize,
    // Hermite weights for each inserted vertex, shared by all segments
    weights: Vec<[f32; 4]>,
}

impl Upsampler {

    pub fn new(ratio: usize, tension: f32) -> Self {
        let ratio = ratio.max(1);
        let mut hermite = Hermite::new(tension);
        let weights = (1..ratio)
            .map(|k| { hermite.set(k as f32 / ratio as f32); hermite.weights() })
            .collect();
        Self { ratio, weights }
    }

    pub fn ratio(&self) -> usize { self.ratio }

    /// Number of vertices produced from `n` input vertices
    pub fn upsampled_len(&self, n: usize) -> usize {
        if n < 2 { n } else { (n - 1) * self.ratio + 1 }
    }

    /// Write the upsampled version of `points` into `out`, reusing its
    /// allocation.
    pub fn upsample_into(&self, points: &[Point], out: &mut Vec<Point>) {
        out.clear();
        if self.ratio == 1 || points.len() < 2 {
            out.extend_from_slice(points);
            return;
        }
        out.reserve(self.upsampled_len(points.len()));
        let padded = pad_ends(points);
        for control in padded.windows(4) {
            out.push(control[1]);
            for &[w0, w1, w2, w3] in &self.weights {
                let c = control[0].coords * w0 + control[1].coords * w1
                      + control[2].coords * w2 + control[3].coords * w3;
                out.push(Point::from(c));
            }
        }
        out.push(points[points.len() - 1]);
    }

    pub fn upsample(&self, points: &[Point]) -> Vec<Point> {
        let mut out = vec![];
        self.upsample_into(points, &mut out);
        out
    }

    /// Linearly interpolate per-vertex values onto the vertices produced by
    /// `upsample`.
    pub fn upsample_values(&self, values: &[f32]) -> Vec<f32> {
        if self.ratio == 1 || values.len() < 2 { return values.to_vec() }
        let mut out = Vec::with_capacity(self.upsampled_len(values.len()));
        for pair in values.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            out.push(a);
            for k in 1..self.ratio {
                let f = k as f32 / self.ratio as f32;
                out.push(a + (b - a) * f);
            }
        }
        out.push(values[values.len() - 1]);
        out
    }
}

/// Direction of travel along the curve at its start, used to sanity-check
/// padding.
#[cfg(test)]
fn first_step(points: &[Point]) -> crate::Vector { points[1] - points[0] }
