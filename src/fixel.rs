//! Fixels: discrete fibre populations within voxels.
//!
//! A dataset consists of an index image giving, for every voxel, the number
//! of fixels it holds and the position of the first of them in a flat list of
//! fixel directions.

use crate::index::{BoxDim_u, Index3_u, index3_to_1};
use crate::types::Vector;
use crate::error::{MappingError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FixelRange {
    pub count: usize,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct FixelDataset {
    pub n: BoxDim_u,
    index: Vec<FixelRange>,
    directions: Vec<Vector>,
}

impl FixelDataset {

    /// `index` is ordered with x varying fastest. Every range must lie within
    /// `directions`, which are normalized on construction.
    pub fn new(n: BoxDim_u, index: Vec<FixelRange>, directions: Vec<Vector>) -> Result<Self> {
        let expected: usize = n.iter().product();
        if index.len() != expected {
            return Err(MappingError::InvalidFixels(format!(
                "index has {} voxels, expected {expected} for {n:?}", index.len())))
        }
        if let Some(bad) = index.iter().find(|r| r.offset + r.count > directions.len()) {
            return Err(MappingError::InvalidFixels(format!(
                "range {bad:?} beyond the {} available fixels", directions.len())))
        }
        let directions = directions.into_iter()
            .enumerate()
            .map(|(i, d)| geometry::unit(d).ok_or_else(|| MappingError::InvalidFixels(
                format!("fixel {i} has a degenerate direction"))))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("fixel dataset: {} fixels in {} voxels", directions.len(), expected);
        Ok(Self { n, index, directions })
    }

    /// Build a dataset from per-voxel fixel directions, laid out with x
    /// varying fastest
    pub fn from_voxels(n: BoxDim_u, voxels: Vec<Vec<Vector>>) -> Result<Self> {
        let mut index = Vec::with_capacity(voxels.len());
        let mut directions = vec![];
        for fixels in voxels {
            index.push(FixelRange { count: fixels.len(), offset: directions.len() });
            directions.extend(fixels);
        }
        Self::new(n, index, directions)
    }

    pub fn n_fixels(&self) -> usize { self.directions.len() }

    pub fn range(&self, voxel: Index3_u) -> FixelRange { self.index[index3_to_1(voxel, self.n)] }

    pub fn direction(&self, fixel: usize) -> &Vector { &self.directions[fixel] }

    /// Fixel in `voxel` whose direction is most closely aligned with `dir`,
    /// provided that `|cos|` of the angle between them exceeds
    /// `cos_threshold`. Among equally aligned fixels the first wins.
    pub fn nearest_fixel(&self, voxel: Index3_u, dir: &Vector, cos_threshold: f32) -> Option<usize> {
        let FixelRange { count, offset } = self.range(voxel);
        let mut best: Option<(usize, f32)> = None;
        for fixel in offset..offset + count {
            let c = self.directions[fixel].dot(dir).abs();
            if best.map_or(true, |(_, b)| c > b) { best = Some((fixel, c)) }
        }
        best.filter(|&(_, c)| c > cos_threshold).map(|(fixel, _)| fixel)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at_degrees(degrees: f32) -> Vector {
        let r = degrees.to_radians();
        Vector::new(r.cos(), r.sin(), 0.0)
    }

    fn dataset() -> FixelDataset {
        // Voxel 0: fixels along x and y; voxel 1: none; voxel 2: along z
        FixelDataset::from_voxels([3, 1, 1], vec![
            vec![Vector::x(), Vector::y()],
            vec![],
            vec![Vector::z() * 3.0],
        ]).unwrap()
    }

    #[rstest(/**/ voxel,    dir          , expected,
             case([0,0,0], at_degrees( 30.0), Some(0)),
             case([0,0,0], at_degrees( 80.0), Some(1)),
             case([0,0,0], at_degrees(170.0), Some(0)),
             case([1,0,0], at_degrees(  0.0), None),
             case([2,0,0], Vector::z()      , Some(2)),
             case([2,0,0], -Vector::z()     , Some(2)),
             case([2,0,0], at_degrees(  0.0), None),
    )]
    fn nearest(voxel: Index3_u, dir: Vector, expected: Option<usize>) {
        let cos45 = 45_f32.to_radians().cos();
        assert_eq!(dataset().nearest_fixel(voxel, &dir, cos45), expected);
    }

    #[test]
    fn ties_keep_the_first_fixel() {
        let data = FixelDataset::from_voxels([1, 1, 1], vec![vec![Vector::x(), Vector::y()]]).unwrap();
        assert_eq!(data.nearest_fixel([0, 0, 0], &Vector::new(1.0, 1.0, 0.0), 0.0), Some(0));
    }

    #[test]
    fn threshold_is_strict() {
        let data = FixelDataset::from_voxels([1, 1, 1], vec![vec![Vector::x()]]).unwrap();
        assert_eq!(data.nearest_fixel([0, 0, 0], &Vector::x(), 1.0), None);
    }

    #[test]
    fn inconsistent_datasets_are_rejected() {
        let range = |count, offset| FixelRange { count, offset };
        assert!(FixelDataset::new([2, 1, 1], vec![range(1, 0)], vec![Vector::x()]).is_err());
        assert!(FixelDataset::new([1, 1, 1], vec![range(2, 0)], vec![Vector::x()]).is_err());
        assert!(FixelDataset::new([1, 1, 1], vec![range(1, 0)], vec![Vector::zeros()]).is_err());
    }
}
