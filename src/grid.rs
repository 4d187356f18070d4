//! The size, granularity and placement in scanner space of the voxel grid onto
//! which streamlines are mapped

use nalgebra::{Affine3, Matrix4};

use crate::types::{Lengthf32, Point, Vector};
use crate::index::{BoxDim_u, Index3_i, Index3_u, in_bounds};
use crate::error::{MappingError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub n: BoxDim_u,
    pub voxel_size: Vector,
    voxel2scanner: Affine3<Lengthf32>,
    scanner2voxel: Affine3<Lengthf32>,
}

impl Grid {

    /// General grid, as described by an image header: number of voxels along
    /// each axis and the voxel-to-scanner affine transform. Voxel sizes are the
    /// lengths of the columns of the linear part of the transform.
    pub fn new(n: BoxDim_u, voxel2scanner: Matrix4<Lengthf32>) -> Result<Self> {
        if n.iter().any(|&n| n == 0) {
            return Err(MappingError::grid(format!("empty grid {n:?}")))
        }
        if voxel2scanner.row(3).transpose() != nalgebra::Vector4::new(0.0, 0.0, 0.0, 1.0) {
            return Err(MappingError::grid("bottom row of the transform must be [0 0 0 1]"))
        }
        let voxel2scanner = Affine3::from_matrix_unchecked(voxel2scanner);
        let scanner2voxel = voxel2scanner.try_inverse()
            .ok_or_else(|| MappingError::grid("voxel-to-scanner transform is singular"))?;
        let linear = voxel2scanner.matrix().fixed_view::<3, 3>(0, 0);
        let voxel_size = Vector::new(linear.column(0).norm(),
                                     linear.column(1).norm(),
                                     linear.column(2).norm());
        if !voxel_size.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(MappingError::grid(format!("bad voxel size {voxel_size:?}")))
        }
        Ok(Self { n, voxel_size, voxel2scanner, scanner2voxel })
    }

    /// Axis-aligned grid whose voxel `[0,0,0]` is centred on `origin`
    pub fn axis_aligned(n: BoxDim_u, voxel_size: Vector, origin: Point) -> Result<Self> {
        let mut m = Matrix4::from_diagonal(&voxel_size.push(1.0));
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.coords);
        Self::new(n, m)
    }

    /// Axis-aligned grid of total extent `full_size`, centred on the scanner
    /// origin
    pub fn centred(
        full_size: (Lengthf32, Lengthf32, Lengthf32),
        (nx, ny, nz): (usize, usize, usize)
    ) -> Result<Self> {
        let (dx, dy, dz) = full_size;
        let n = [nx, ny, nz];
        let voxel_size = Vector::new(dx / nx as f32, dy / ny as f32, dz / nz as f32);
        let half_width = Vector::new(dx / 2.0, dy / 2.0, dz / 2.0);
        let origin = Point::from(voxel_size / 2.0 - half_width);
        Self::axis_aligned(n, voxel_size, origin)
    }

    pub fn voxel2scanner(&self) -> &Affine3<Lengthf32> { &self.voxel2scanner }
    pub fn scanner2voxel(&self) -> &Affine3<Lengthf32> { &self.scanner2voxel }

    pub fn nvoxels(&self) -> usize { self.n.iter().product() }

    pub fn min_voxel_size(&self) -> Lengthf32 { self.voxel_size.min() }

    /// Continuous voxel coordinates of a scanner-space point: voxel centres lie
    /// on integer values
    #[inline]
    pub fn to_voxel(&self, p: &Point) -> Point { self.scanner2voxel * p }

    /// Nearest voxel to a scanner-space point, which may be outside the grid.
    /// Non-finite coordinates map far outside.
    #[inline]
    pub fn voxel_of(&self, p: &Point) -> Index3_i {
        let v = self.to_voxel(p);
        let round = |c: f32| if c.is_finite() { c.round() as i32 } else { i32::MIN };
        [round(v.x), round(v.y), round(v.z)]
    }

    #[inline]
    pub fn contains(&self, voxel: Index3_i) -> Option<Index3_u> { in_bounds(voxel, self.n) }

    /// Find centre of voxel with given 3D index
    pub fn voxel_centre(&self, i: Index3_u) -> Point {
        self.voxel2scanner * Point::new(i[0] as f32, i[1] as f32, i[2] as f32)
    }

}

#[cfg(test)]
mod test_grid {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;

    #[rstest(/**/ index,   expected_position,
             case([0,0,0], [-1.0, -1.0, -1.0]),
             case([0,0,1], [-1.0, -1.0,  1.0]),
             case([0,1,0], [-1.0,  1.0, -1.0]),
             case([0,1,1], [-1.0,  1.0,  1.0]),
             case([1,0,0], [ 1.0, -1.0, -1.0]),
             case([1,0,1], [ 1.0, -1.0,  1.0]),
             case([1,1,0], [ 1.0,  1.0, -1.0]),
             case([1,1,1], [ 1.0,  1.0,  1.0]),
    )]
    fn test_voxel_centre(index: Index3_u, expected_position: [Lengthf32; 3]) {
        let grid = Grid::centred((4.0, 4.0, 4.0), (2,2,2)).unwrap();
        let c = grid.voxel_centre(index);
        assert_float_eq!([c.x, c.y, c.z], expected_position, abs <= [1e-6; 3]);
        assert_eq!(grid.voxel_of(&c), [index[0] as i32, index[1] as i32, index[2] as i32]);
    }

    #[rstest(/**/      point      , expected ,
             case(( 0.4, 0.4, 0.4), [ 0, 0, 0]),
             case(( 0.6, 0.0, 0.0), [ 1, 0, 0]),
             case((-0.6, 0.0, 2.6), [-1, 0, 3]),
             case(( 9.0, 9.0, 9.0), [ 9, 9, 9]),
             case((f32::NAN, 0.0, 0.0), [i32::MIN; 3]),
    )]
    fn nearest_voxel(point: (f32, f32, f32), expected: Index3_i) {
        let (x, y, z) = point;
        let grid = Grid::axis_aligned([3, 3, 3], Vector::new(1.0, 1.0, 1.0), Point::origin()).unwrap();
        assert_eq!(grid.voxel_of(&Point::new(x, y, z)), expected);
    }

    #[test]
    fn voxel_size_follows_transform() {
        // 90 degree rotation about z combined with anisotropic scaling
        let m = Matrix4::new(0.0, -3.0, 0.0, 10.0,
                             2.0,  0.0, 0.0, 20.0,
                             0.0,  0.0, 1.5, 30.0,
                             0.0,  0.0, 0.0,  1.0);
        let grid = Grid::new([4, 5, 6], m).unwrap();
        assert_float_eq!([grid.voxel_size.x, grid.voxel_size.y, grid.voxel_size.z], [2.0, 3.0, 1.5], ulps <= [1; 3]);
        assert_float_eq!(grid.min_voxel_size(), 1.5, ulps <= 1);
        let p = grid.voxel_centre([1, 2, 3]);
        assert_eq!(grid.voxel_of(&p), [1, 2, 3]);
        assert_eq!(grid.nvoxels(), 120);
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(Grid::axis_aligned([0, 1, 1], Vector::new(1.0, 1.0, 1.0), Point::origin()).is_err());
        assert!(Grid::axis_aligned([1, 1, 1], Vector::new(1.0, 0.0, 1.0), Point::origin()).is_err());
    }
}
