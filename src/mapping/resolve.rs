//! Attribute resolution: turning a (voxel, direction) contribution into the
//! extra identity or payload carried by direction-aware entries.

use std::sync::Arc;

use units::{Angle, cos_, degree};

use crate::directions::DirectionSet;
use crate::fixel::FixelDataset;
use crate::index::Index3_u;
use crate::sh::Apsf;
use crate::types::{Vector, DEFAULT_FIXEL_ANGLE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginKind { Dixel, Tod, Fixel }

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PluginKind::Dixel => "dixel",
            PluginKind::Tod   => "TOD",
            PluginKind::Fixel => "fixel",
        };
        write!(f, "{name} plugin")
    }
}

pub trait Resolve {
    type Attribute;
    fn resolve(&self, voxel: Index3_u, direction: &Vector) -> Option<Self::Attribute>;
}

/// Nearest bin of a shared direction set
#[derive(Clone, Debug)]
pub struct DixelPlugin {
    directions: Arc<DirectionSet>,
}

impl DixelPlugin {
    pub fn new(directions: Arc<DirectionSet>) -> Self { Self { directions } }
    pub fn directions(&self) -> &DirectionSet { &self.directions }
}

impl Resolve for DixelPlugin {
    type Attribute = usize;
    fn resolve(&self, _voxel: Index3_u, direction: &Vector) -> Option<usize> {
        self.directions.select_direction(direction)
    }
}

/// Apodized PSF coefficients of the direction, at unit amplitude. Each mapper
/// owns its own copy.
#[derive(Clone, Debug)]
pub struct TodPlugin {
    apsf: Apsf,
}

impl TodPlugin {
    pub fn new(lmax: usize) -> Self { Self { apsf: Apsf::new(lmax) } }
    pub fn lmax(&self) -> usize { self.apsf.lmax() }
    pub fn n_coefs(&self) -> usize { self.apsf.n_coefs() }
}

impl Resolve for TodPlugin {
    type Attribute = Vec<f32>;
    fn resolve(&self, _voxel: Index3_u, direction: &Vector) -> Option<Vec<f32>> {
        let direction = geometry::unit(*direction)?;
        Some(self.apsf.coefficients(&direction))
    }
}

/// Best-aligned fixel of a shared dataset, within an angular threshold
#[derive(Clone, Debug)]
pub struct FixelPlugin {
    fixels: Arc<FixelDataset>,
    cos_threshold: f32,
}

impl FixelPlugin {
    pub fn new(fixels: Arc<FixelDataset>) -> Self {
        Self::with_angle(fixels, degree(DEFAULT_FIXEL_ANGLE))
    }

    pub fn with_angle(fixels: Arc<FixelDataset>, threshold: Angle) -> Self {
        Self { fixels, cos_threshold: cos_(threshold) }
    }

    pub fn fixels(&self) -> &FixelDataset { &self.fixels }
}

impl Resolve for FixelPlugin {
    type Attribute = usize;
    fn resolve(&self, voxel: Index3_u, direction: &Vector) -> Option<usize> {
        let direction = geometry::unit(*direction)?;
        self.fixels.nearest_fixel(voxel, &direction, self.cos_threshold)
    }
}

/// The one attribute plugin attached to a mapper
#[derive(Clone, Debug)]
pub enum Resolver {
    Dixel(DixelPlugin),
    Tod  (TodPlugin),
    Fixel(FixelPlugin),
}

impl Resolver {
    pub fn kind(&self) -> PluginKind {
        match self {
            Resolver::Dixel(_) => PluginKind::Dixel,
            Resolver::Tod  (_) => PluginKind::Tod,
            Resolver::Fixel(_) => PluginKind::Fixel,
        }
    }
}
