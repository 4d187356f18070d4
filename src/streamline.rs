use crate::types::{Lengthf32, Point, Weightf32};


/// Streamline.
///
/// Ordered vertices of a 3D trajectory in scanner space, together with the
/// weight with which it contributes to any accumulated map and its position
/// in the input stream. The mapper never modifies a streamline.
#[derive(Clone, Debug, PartialEq)]
pub struct Streamline {
    pub points: Vec<Point>,
    pub weight: Weightf32,
    pub index: usize,
}

impl Streamline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points, weight: 1.0, index: 0 }
    }

    pub fn with_weight(self, weight: Weightf32) -> Self { Self { weight, ..self } }
    pub fn with_index (self, index : usize    ) -> Self { Self { index , ..self } }

    pub fn from_components(points: impl IntoIterator<Item = (Lengthf32, Lengthf32, Lengthf32)>) -> Self {
        Self::new(points.into_iter().map(|(x, y, z)| Point::new(x, y, z)).collect())
    }

    pub fn len     (&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool  { self.points.is_empty() }

    /// Length of the polyline through the vertices
    pub fn length(&self) -> Lengthf32 { geometry::polyline_length(&self.points) }

    pub fn first(&self) -> Option<&Point> { self.points.first() }
    pub fn last (&self) -> Option<&Point> { self.points.last () }
}

use core::fmt;
impl fmt::Display for Streamline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.first(), self.last()) {
            (Some(p), Some(q)) =>
                write!(f, "<Streamline #{} ({:8.2} {:8.2} {:8.2}) .. ({:8.2} {:8.2} {:8.2}) {:4} points {:7.2}mm w={:.3} >",
                       self.index,
                       p.x, p.y, p.z,
                       q.x, q.y, q.z,
                       self.len(), self.length(), self.weight),
            _ => write!(f, "<Streamline #{} empty >", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn length_of_polyline() {
        let s = Streamline::from_components([(0.0, 0.0, 0.0), (3.0, 4.0, 0.0), (3.0, 4.0, 2.0)]);
        assert_float_eq!(s.length(), 7.0, ulps <= 1);
        assert_eq!(s.len(), 3);
        assert_eq!(s.weight, 1.0);
    }

    #[test]
    fn builders_set_metadata() {
        let s = Streamline::new(vec![]).with_weight(0.25).with_index(17);
        assert!(s.is_empty());
        assert_eq!((s.weight, s.index), (0.25, 17));
        assert_eq!(s.length(), 0.0);
        assert!(format!("{s}").contains("#17"));
    }
}
