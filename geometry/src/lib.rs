//! Points, vectors and curves in scanner space.
//!
//! All coordinates are `f32` millimetres.

mod hermite;

pub use hermite::{Hermite, Upsampler, pad_ends};

use units::todo::Lengthf32;

pub type Point  = nalgebra::Point3 <Lengthf32>;
pub type Vector = nalgebra::Vector3<Lengthf32>;

/// Un-normalized local tangent of a polyline at vertex `i`: central difference
/// in the interior, one-sided difference at either end. Zero for a single
/// point.
pub fn tangent(points: &[Point], i: usize) -> Vector {
    let n = points.len();
    if n < 2 { return Vector::zeros() }
    let prev = if i == 0     { 0     } else { i - 1 };
    let next = if i == n - 1 { n - 1 } else { i + 1 };
    points[next] - points[prev]
}

/// Sum of the straight segment lengths of a polyline
pub fn polyline_length(points: &[Point]) -> Lengthf32 {
    points.windows(2)
        .map(|w| (w[1] - w[0]).norm())
        .sum()
}

/// Normalize `v`, returning `None` if the result would not be a finite unit
/// vector.
pub fn unit(v: Vector) -> Option<Vector> {
    let norm = v.norm();
    if norm > 0.0 && norm.is_finite() { Some(v / norm) }
    else                              { None }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;

    fn line(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f32, 2.0 * i as f32, 0.0)).collect()
    }

    #[rstest(/**/ n, i, expected,
             case(5, 0, [1.0, 2.0, 0.0]), // one-sided at the front
             case(5, 2, [2.0, 4.0, 0.0]), // central in the interior
             case(5, 4, [1.0, 2.0, 0.0]), // one-sided at the back
             case(2, 1, [1.0, 2.0, 0.0]),
             case(1, 0, [0.0, 0.0, 0.0]), // single point has no tangent
    )]
    fn tangent_at_vertex(n: usize, i: usize, expected: [f32; 3]) {
        let t = tangent(&line(n), i);
        assert_float_eq!([t.x, t.y, t.z], expected, ulps <= [1, 1, 1]);
    }

    #[test]
    fn length_of_straight_polyline() {
        assert_float_eq!(polyline_length(&line(4)), 3.0 * 5.0_f32.sqrt(), rel <= 1e-6);
        assert_eq!(polyline_length(&line(1)), 0.0);
    }

    #[test]
    fn unit_rejects_degenerate_vectors() {
        assert!(unit(Vector::zeros()).is_none());
        assert!(unit(Vector::new(f32::NAN, 0.0, 0.0)).is_none());
        let u = unit(Vector::new(0.0, 3.0, 4.0)).unwrap();
        assert_float_eq!(u.norm(), 1.0, ulps <= 1);
    }
}
