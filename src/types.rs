pub use units::todo::{Lengthf32, Weightf32, Ratiof32, Anglef32, Intensityf32};

pub use geometry::{Point, Vector};

pub use crate::index::{BoxDim_u, Index1_u, Index3_u, Index3_i};

/// Fraction of the smallest voxel dimension to which the precise traversal
/// locates voxel boundaries.
pub const BISECTION_ACCURACY_FRACTION: Ratiof32 = 0.005;

/// Safety net for the boundary bisection, on top of the accuracy criterion.
pub const MAX_BISECTION_ITERATIONS: usize = 64;

/// Tension of the Hermite curve used for both upsampling and precise
/// traversal. Small and positive, to avoid bulging between vertices.
pub const HERMITE_TENSION: f32 = 0.1;

/// A fixel is only assigned if it lies within this angle of the streamline
/// tangent.
pub const DEFAULT_FIXEL_ANGLE: Anglef32 = 45.0;
