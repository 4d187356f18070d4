#[allow(non_camel_case_types)] pub type Index1_u = usize;
#[allow(non_camel_case_types)] pub type Index3_u = [usize; 3];
#[allow(non_camel_case_types)] pub type BoxDim_u = [usize; 3];

/// Rounded voxel coordinate which may lie outside of the grid
#[allow(non_camel_case_types)] pub type Index3_i = [i32; 3];

// --------------------------------------------------------------------------------
//                  Conversion between 1d and 3d indices

use std::ops::{Add, Div, Mul, Rem};

pub fn index3_to_1<T>([ix, iy, iz]: [T; 3], [nx, ny, _nz]: [T; 3]) -> T
where
    T: Mul<Output = T> + Add<Output = T>
{
    ix + (iy + iz * ny) * nx
}

#[allow(clippy::many_single_char_names)]
pub fn index1_to_3<T>(i: T, [nx, ny, _nz]: [T; 3]) -> [T; 3]
where
    T: Mul<Output = T> +
    Div<Output = T> +
    Rem<Output = T> +
    Copy
{
    let z = i / (nx * ny);
    let r = i % (nx * ny);
    let y = r / nx;
    let x = r % nx;
    [x,y,z]
}

/// The in-grid index corresponding to a rounded voxel coordinate, if any
pub fn in_bounds(voxel: Index3_i, n: BoxDim_u) -> Option<Index3_u> {
    let mut out = [0; 3];
    for axis in 0..3 {
        let v = voxel[axis];
        if v < 0 || v as usize >= n[axis] { return None }
        out[axis] = v as usize;
    }
    Some(out)
}
