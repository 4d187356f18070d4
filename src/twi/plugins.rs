//! Loading of track-weighting factors from auxiliary images.
//!
//! Every plugin reports a failed sample as NaN; deciding what a NaN means for
//! the streamline is left to the caller.

use std::sync::Arc;

use itertools::iproduct;

use crate::error::{MappingError, Result};
use crate::image::Image;
use crate::sh::{PrecomputedAL, l_for_n};
use crate::types::{Point, Weightf32};

use super::stats::{pearson, weighted_pearson};

/// Which end of a streamline a sample refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum End { Start, Finish }

/// Vertex to sample for one end of a streamline of `n` vertices. Without
/// backtracking only the end vertex itself is considered; with backtracking,
/// vertices are tried stepping inwards from that end until `valid` holds,
/// possibly all the way to the opposite end.
pub fn end_index(n: usize, end: End, backtrack: bool, valid: impl Fn(usize) -> bool) -> Option<usize> {
    if n == 0 { return None }
    let first = match end { End::Start => 0, End::Finish => n - 1 };
    if !backtrack { return Some(first).filter(|&i| valid(i)) }
    match end {
        End::Start  => (0..n)      .find(|&i| valid(i)),
        End::Finish => (0..n).rev().find(|&i| valid(i)),
    }
}

// ----- Scalar image ---------------------------------------------------------------
#[derive(Clone, Debug)]
pub struct ScalarPlugin {
    image: Arc<Image>,
    backtrack: bool,
}

impl ScalarPlugin {
    pub fn new(image: Arc<Image>, backtrack: bool) -> Result<Self> {
        if image.nvol() != 1 {
            return Err(MappingError::image(format!("scalar image must have 1 volume, found {}", image.nvol())))
        }
        Ok(Self { image, backtrack })
    }

    fn sample(&self, p: &Point) -> Option<f32> {
        self.image.sample(p, 0).filter(|v| v.is_finite())
    }

    pub fn vertices(&self, points: &[Point]) -> Vec<f32> {
        points.iter().map(|p| self.sample(p).unwrap_or(f32::NAN)).collect()
    }

    pub fn end(&self, points: &[Point], end: End) -> f32 {
        end_index(points.len(), end, self.backtrack, |i| self.sample(&points[i]).is_some())
            .and_then(|i| self.sample(&points[i]))
            .unwrap_or(f32::NAN)
    }
}

// ----- FOD amplitude along the tangent --------------------------------------------
#[derive(Clone, Debug)]
pub struct FodPlugin {
    image: Arc<Image>,
    evaluator: Arc<PrecomputedAL>,
    backtrack: bool,
}

impl FodPlugin {
    pub fn new(image: Arc<Image>, backtrack: bool) -> Result<Self> {
        let lmax = l_for_n(image.nvol()).ok_or_else(|| MappingError::image(format!(
            "{} volumes is not a valid number of even-degree SH coefficients", image.nvol())))?;
        log::debug!("FOD factor plugin: lmax = {lmax}");
        Ok(Self { image, evaluator: Arc::new(PrecomputedAL::new(lmax)), backtrack })
    }

    fn amplitude(&self, points: &[Point], i: usize) -> Option<f32> {
        let tangent = geometry::unit(geometry::tangent(points, i))?;
        let coefs = self.image.sample_row(&points[i])?;
        Some(self.evaluator.value(&coefs, &tangent)).filter(|v| v.is_finite())
    }

    fn in_field(&self, p: &Point) -> bool { self.image.sample_row(p).is_some() }

    pub fn vertices(&self, points: &[Point]) -> Vec<f32> {
        (0..points.len()).map(|i| self.amplitude(points, i).unwrap_or(f32::NAN)).collect()
    }

    pub fn end(&self, points: &[Point], end: End) -> f32 {
        end_index(points.len(), end, self.backtrack, |i| self.in_field(&points[i]))
            .and_then(|i| self.amplitude(points, i))
            .unwrap_or(f32::NAN)
    }
}

// ----- Time series ------------------------------------------------------------------

/// 4D image whose volumes are time points, with a mask of the voxels holding
/// a usable series: all values finite and non-zero variance.
#[derive(Clone, Debug)]
pub struct TimeSeriesImage {
    image: Image,
    valid: Vec<bool>,
}

impl TimeSeriesImage {
    pub fn new(image: Image) -> Result<Self> {
        if image.nvol() < 2 {
            return Err(MappingError::image("a time series needs at least 2 volumes"))
        }
        let [nx, ny, nz] = image.grid.n;
        let mut valid = Vec::with_capacity(nx * ny * nz);
        for (z, y, x) in iproduct!(0..nz, 0..ny, 0..nx) {
            let row = image.voxel_row([x, y, z]);
            let usable = row.iter().all(|v| v.is_finite()) && {
                let first = row[0];
                row.iter().any(|&v| v != first)
            };
            valid.push(usable);
        }
        log::debug!("time series: {} of {} voxels usable", valid.iter().filter(|&&v| v).count(), valid.len());
        Ok(Self { image, valid })
    }

    pub fn n_timepoints(&self) -> usize { self.image.nvol() }

    pub fn is_valid(&self, p: &Point) -> bool {
        let grid = &self.image.grid;
        grid.contains(grid.voxel_of(p))
            .map_or(false, |v| self.valid[crate::index::index3_to_1(v, grid.n)])
    }

    /// Interpolated series at `p`, if the voxel containing `p` is usable
    pub fn series(&self, p: &Point) -> Option<Vec<f32>> {
        if !self.is_valid(p) { return None }
        self.image.sample_row(p)
    }

    fn end_series(&self, points: &[Point], end: End, backtrack: bool) -> Option<Vec<f32>> {
        end_index(points.len(), end, backtrack, |i| self.is_valid(&points[i]))
            .and_then(|i| self.series(&points[i]))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelShape { Rectangle, Triangle, Cosine, Hann, Hamming, Lanczos }

/// Weights of a sliding window of odd width, centred on its middle element
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    shape: KernelShape,
    weights: Vec<Weightf32>,
}

impl Kernel {
    pub fn new(shape: KernelShape, width: usize) -> Result<Self> {
        if width % 2 == 0 {
            return Err(MappingError::InvalidWindow(format!("width must be odd, got {width}")))
        }
        use std::f32::consts::PI;
        let half = (width / 2) as i64;
        let weights = (-half..=half).map(|k| {
            let u = k as f32 / (half + 1) as f32;
            match shape {
                KernelShape::Rectangle => 1.0,
                KernelShape::Triangle  => 1.0 - u.abs(),
                KernelShape::Cosine    => (0.5 * PI * u).cos(),
                KernelShape::Hann      => 0.5 * (1.0 + (PI * u).cos()),
                KernelShape::Hamming   => 0.54 + 0.46 * (PI * u).cos(),
                KernelShape::Lanczos   => if k == 0 { 1.0 } else { (PI * u).sin() / (PI * u) },
            }
        }).collect();
        Ok(Self { shape, weights })
    }

    pub fn shape(&self) -> KernelShape { self.shape }
    pub fn width(&self) -> usize { self.weights.len() }
    pub fn weights(&self) -> &[Weightf32] { &self.weights }
}

/// Correlation of the whole time series at the two ends
#[derive(Clone, Debug)]
pub struct StaticFcPlugin {
    series: Arc<TimeSeriesImage>,
    backtrack: bool,
}

impl StaticFcPlugin {
    pub fn new(series: Arc<TimeSeriesImage>, backtrack: bool) -> Self { Self { series, backtrack } }

    pub fn correlation(&self, points: &[Point]) -> f32 {
        let a = self.series.end_series(points, End::Start , self.backtrack);
        let b = self.series.end_series(points, End::Finish, self.backtrack);
        match (a, b) {
            (Some(a), Some(b)) => pearson(&a, &b),
            _ => f32::NAN,
        }
    }
}

/// Correlation within a kernel-weighted window around each of several time
/// points
#[derive(Clone, Debug)]
pub struct DynamicFcPlugin {
    series: Arc<TimeSeriesImage>,
    kernel: Kernel,
    centres: Vec<usize>,
    backtrack: bool,
}

impl DynamicFcPlugin {
    pub fn new(series: Arc<TimeSeriesImage>, kernel: Kernel, centres: Vec<usize>, backtrack: bool) -> Result<Self> {
        if centres.is_empty() {
            return Err(MappingError::InvalidWindow("no window centres given".into()))
        }
        let nt = series.n_timepoints();
        if let Some(c) = centres.iter().find(|&&c| c >= nt) {
            return Err(MappingError::InvalidWindow(format!("centre {c} beyond {nt} time points")))
        }
        Ok(Self { series, kernel, centres, backtrack })
    }

    pub fn centres(&self) -> &[usize] { &self.centres }

    /// One value per window centre
    pub fn correlations(&self, points: &[Point]) -> Vec<f32> {
        let a = self.series.end_series(points, End::Start , self.backtrack);
        let b = self.series.end_series(points, End::Finish, self.backtrack);
        let (Some(a), Some(b)) = (a, b) else { return vec![f32::NAN; self.centres.len()] };
        let nt = a.len() as i64;
        let half = (self.kernel.width() / 2) as i64;
        self.centres.iter().map(|&centre| {
            let (mut wa, mut wb, mut ww) = (vec![], vec![], vec![]);
            for (k, &w) in (-half..=half).zip(self.kernel.weights()) {
                let t = centre as i64 + k;
                if t < 0 || t >= nt { continue }
                wa.push(a[t as usize]);
                wb.push(b[t as usize]);
                ww.push(w);
            }
            weighted_pearson(&wa, &wb, &ww)
        }).collect()
    }
}

// ----- Dispatch ---------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum FactorPlugin {
    Scalar   (ScalarPlugin),
    Fod      (FodPlugin),
    StaticFc (StaticFcPlugin),
    DynamicFc(DynamicFcPlugin),
}

impl FactorPlugin {
    pub fn name(&self) -> &'static str {
        match self {
            FactorPlugin::Scalar   (_) => "scalar image",
            FactorPlugin::Fod      (_) => "FOD image",
            FactorPlugin::StaticFc (_) => "static FC",
            FactorPlugin::DynamicFc(_) => "dynamic FC",
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, FactorPlugin::StaticFc(_) | FactorPlugin::DynamicFc(_))
    }

    /// One sample per vertex; NaN for connectivity plugins
    pub fn vertices(&self, points: &[Point]) -> Vec<f32> {
        match self {
            FactorPlugin::Scalar(p) => p.vertices(points),
            FactorPlugin::Fod   (p) => p.vertices(points),
            _ => vec![f32::NAN; points.len()],
        }
    }

    /// Samples at the two (possibly backtracked) ends
    pub fn ends(&self, points: &[Point]) -> [f32; 2] {
        match self {
            FactorPlugin::Scalar(p) => [p.end(points, End::Start), p.end(points, End::Finish)],
            FactorPlugin::Fod   (p) => [p.end(points, End::Start), p.end(points, End::Finish)],
            _ => [f32::NAN; 2],
        }
    }

    /// Endpoint correlation; for a dynamic plugin, that of the first window
    pub fn correlation(&self, points: &[Point]) -> f32 {
        match self {
            FactorPlugin::StaticFc (p) => p.correlation(points),
            FactorPlugin::DynamicFc(p) => p.correlations(points).first().cloned().unwrap_or(f32::NAN),
            _ => f32::NAN,
        }
    }
}
