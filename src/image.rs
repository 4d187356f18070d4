//! Auxiliary images sampled along streamlines: scalar maps, SH coefficient
//! (FOD) images and fMRI time series.
//!
//! Data are held as `(nx, ny, nz, nvol)` in Fortran order, so that a flat
//! buffer with x varying fastest and the volume slowest can be adopted without
//! copying.

use ndarray::{Array4, ArrayView1, ShapeBuilder, s};

use crate::grid::Grid;
use crate::index::Index3_u;
use crate::types::{Intensityf32, Point};
use crate::error::{MappingError, Result};

#[derive(Clone, Debug)]
pub struct Image {
    pub grid: Grid,
    data: Array4<Intensityf32>,
}

impl Image {

    pub fn new(grid: Grid, data: Array4<Intensityf32>) -> Result<Self> {
        let [nx, ny, nz] = grid.n;
        let (dx, dy, dz, nvol) = data.dim();
        if (dx, dy, dz) != (nx, ny, nz) {
            return Err(MappingError::image(format!(
                "data shape {:?} does not match grid {:?}", (dx, dy, dz), grid.n)))
        }
        if nvol == 0 { return Err(MappingError::image("image has no volumes")) }
        Ok(Self { grid, data })
    }

    /// Adopt a flat buffer with x varying fastest and the volume index slowest
    pub fn from_vec(grid: Grid, nvol: usize, data: Vec<Intensityf32>) -> Result<Self> {
        let [nx, ny, nz] = grid.n;
        let data = Array4::from_shape_vec((nx, ny, nz, nvol).f(), data)
            .map_err(|e| MappingError::image(e.to_string()))?;
        Self::new(grid, data)
    }

    pub fn zeros(grid: Grid, nvol: usize) -> Result<Self> {
        let [nx, ny, nz] = grid.n;
        Self::new(grid, Array4::zeros((nx, ny, nz, nvol).f()))
    }

    pub fn nvol(&self) -> usize { self.data.dim().3 }

    pub fn data(&self) -> &Array4<Intensityf32> { &self.data }

    pub fn value(&self, [x, y, z]: Index3_u, vol: usize) -> Intensityf32 { self.data[[x, y, z, vol]] }

    pub fn set(&mut self, [x, y, z]: Index3_u, vol: usize, value: Intensityf32) {
        self.data[[x, y, z, vol]] = value;
    }

    /// All volumes at one voxel
    pub fn voxel_row(&self, [x, y, z]: Index3_u) -> ArrayView1<Intensityf32> {
        self.data.slice(s![x, y, z, ..])
    }

    /// The 8 voxels surrounding `p` and their trilinear weights, or `None` if
    /// `p` lies more than half a voxel outside the grid. Neighbours beyond the
    /// edge are clamped onto it.
    fn trilinear_stencil(&self, p: &Point) -> Option<[(Index3_u, f32); 8]> {
        let v = self.grid.to_voxel(p);
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        let mut frac = [0.0; 3];
        for axis in 0..3 {
            let c = v[axis];
            let n = self.grid.n[axis];
            if !(c >= -0.5 && c <= n as f32 - 0.5) { return None }
            let base = c.floor();
            frac[axis] = c - base;
            let base = base as i64;
            let clamp = |i: i64| i.clamp(0, n as i64 - 1) as usize;
            lo[axis] = clamp(base);
            hi[axis] = clamp(base + 1);
        }
        let mut stencil = [([0; 3], 0.0); 8];
        for (corner, entry) in stencil.iter_mut().enumerate() {
            let mut index = [0; 3];
            let mut weight = 1.0;
            for axis in 0..3 {
                if corner >> axis & 1 == 1 { index[axis] = hi[axis]; weight *=       frac[axis]  }
                else                       { index[axis] = lo[axis]; weight *= 1.0 - frac[axis]  }
            }
            *entry = (index, weight);
        }
        Some(stencil)
    }

    /// Trilinearly interpolated value of one volume at scanner position `p`
    pub fn sample(&self, p: &Point, vol: usize) -> Option<Intensityf32> {
        let stencil = self.trilinear_stencil(p)?;
        Some(stencil.iter()
             .filter(|(_, w)| *w != 0.0)
             .map(|&(voxel, w)| w * self.value(voxel, vol))
             .sum())
    }

    /// Trilinearly interpolated values of all volumes at scanner position `p`
    pub fn sample_row(&self, p: &Point) -> Option<Vec<Intensityf32>> {
        let stencil = self.trilinear_stencil(p)?;
        let mut out = vec![0.0; self.nvol()];
        for &(voxel, w) in stencil.iter().filter(|(_, w)| *w != 0.0) {
            for (o, v) in out.iter_mut().zip(self.voxel_row(voxel)) {
                *o += w * v;
            }
        }
        Some(out)
    }
}

impl core::ops::Index<Index3_u> for Image {
    type Output = Intensityf32;
    fn index(&self, [x, y, z]: Index3_u) -> &Self::Output { &self.data[[x, y, z, 0]] }
}
