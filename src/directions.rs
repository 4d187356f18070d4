//! A fixed set of unit directions on the (antipodally symmetric) sphere, with
//! fast nearest-direction lookup.
//!
//! `d` and `-d` are the same direction: angles are `acos(|a . b|)`.
//!
//! Lookup goes through a coarse grid over (elevation, azimuth) of the upper
//! hemisphere. Each cell remembers the direction nearest to its centre, from
//! which a greedy walk over precomputed neighbour lists reaches the direction
//! nearest to the query.

use std::f32::consts::{FRAC_PI_2, PI};

use crate::types::Vector;
use crate::error::{MappingError, Result};

/// Neighbour lists include every direction within this multiple of the
/// largest nearest-neighbour angle in the set.
const ADJACENCY_SPAN: f32 = 3.0;

/// Lookup cells are this fraction of the smallest nearest-neighbour angle ...
const CELL_FRACTION: f32 = 0.25;
/// ... but never smaller than this (radians)
const MIN_CELL_SIZE: f32 = 0.02;

#[derive(Clone, Debug)]
pub struct DirectionSet {
    dirs: Vec<Vector>,
    adjacency: Vec<Vec<usize>>,
    lookup: LookupGrid,
}

#[derive(Clone, Debug)]
struct LookupGrid {
    cell: f32,
    n_elevation: usize,
    n_azimuth: usize,
    seeds: Vec<usize>,
}

#[inline]
fn closeness(a: &Vector, b: &Vector) -> f32 { a.dot(b).abs() }

#[inline]
fn angle(a: &Vector, b: &Vector) -> f32 { closeness(a, b).min(1.0).acos() }

impl DirectionSet {

    pub fn new(dirs: impl IntoIterator<Item = Vector>) -> Result<Self> {
        let dirs = dirs.into_iter()
            .enumerate()
            .map(|(i, d)| geometry::unit(d).ok_or_else(|| MappingError::InvalidDirections(
                format!("direction {i} ({}, {}, {}) cannot be normalized", d.x, d.y, d.z))))
            .collect::<Result<Vec<_>>>()?;
        if dirs.is_empty() { return Err(MappingError::InvalidDirections("empty set".into())) }

        let nearest_angles: Vec<f32> = dirs.iter().enumerate()
            .map(|(i, d)| dirs.iter().enumerate()
                 .filter(|&(j, _)| j != i)
                 .map(|(_, e)| angle(d, e))
                 .fold(FRAC_PI_2, f32::min))
            .collect();
        let max_nn = nearest_angles.iter().cloned().fold(0.0, f32::max);
        let min_nn = nearest_angles.iter().cloned().fold(FRAC_PI_2, f32::min);

        let span = (ADJACENCY_SPAN * max_nn).min(FRAC_PI_2);
        let adjacency = dirs.iter().enumerate()
            .map(|(i, d)| dirs.iter().enumerate()
                 .filter(|&(j, e)| j != i && angle(d, e) <= span)
                 .map(|(j, _)| j)
                 .collect())
            .collect();

        let cell = (CELL_FRACTION * min_nn).max(MIN_CELL_SIZE);
        let n_elevation = (FRAC_PI_2 / cell).ceil() as usize;
        let n_azimuth   = (2.0 * PI  / cell).ceil() as usize;
        let mut seeds = Vec::with_capacity(n_elevation * n_azimuth);
        for e in 0..n_elevation {
            let elevation = ((e as f32 + 0.5) * cell).min(FRAC_PI_2);
            for a in 0..n_azimuth {
                let azimuth = -PI + (a as f32 + 0.5) * cell;
                let centre = Vector::new(elevation.sin() * azimuth.cos(),
                                         elevation.sin() * azimuth.sin(),
                                         elevation.cos());
                seeds.push(brute_force_nearest(&dirs, &centre));
            }
        }

        log::debug!("direction set: {} directions, lookup grid {}x{}, nearest-neighbour angles {:.3}..{:.3} rad",
                    dirs.len(), n_elevation, n_azimuth, min_nn, max_nn);
        let lookup = LookupGrid { cell, n_elevation, n_azimuth, seeds };
        Ok(Self { dirs, adjacency, lookup })
    }

    /// `n` directions spread evenly over the upper hemisphere along a
    /// Fibonacci spiral
    pub fn fibonacci(n: usize) -> Result<Self> {
        let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
        Self::new((0..n).map(|i| {
            let z = 1.0 - (i as f32 + 0.5) / n as f32;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = golden_angle * i as f32;
            Vector::new(r * phi.cos(), r * phi.sin(), z)
        }))
    }

    pub fn len(&self) -> usize { self.dirs.len() }
    pub fn is_empty(&self) -> bool { self.dirs.is_empty() }

    pub fn get(&self, i: usize) -> &Vector { &self.dirs[i] }
    pub fn iter(&self) -> impl Iterator<Item = &Vector> { self.dirs.iter() }

    /// Index of the set member nearest to `dir` (which need not be
    /// normalized). Returns `None` for zero or non-finite `dir`.
    pub fn select_direction(&self, dir: &Vector) -> Option<usize> {
        let dir = geometry::unit(*dir)?;
        let mut current = self.lookup.seed(&dir);
        let mut best = closeness(&dir, &self.dirs[current]);
        loop {
            let mut next = current;
            for &j in &self.adjacency[current] {
                let c = closeness(&dir, &self.dirs[j]);
                if c > best { best = c; next = j; }
            }
            if next == current { return Some(current) }
            current = next;
        }
    }

    /// Exhaustive search, for checking `select_direction`
    pub fn select_direction_slow(&self, dir: &Vector) -> Option<usize> {
        let dir = geometry::unit(*dir)?;
        Some(brute_force_nearest(&self.dirs, &dir))
    }
}

impl LookupGrid {
    fn seed(&self, dir: &Vector) -> usize {
        let d = if dir.z < 0.0 { -dir } else { *dir };
        let elevation = d.z.clamp(-1.0, 1.0).acos();
        let azimuth = d.y.atan2(d.x);
        let e = ((elevation / self.cell) as usize).min(self.n_elevation - 1);
        let a = (((azimuth + PI) / self.cell) as usize).min(self.n_azimuth - 1);
        self.seeds[e * self.n_azimuth + a]
    }
}

fn brute_force_nearest(dirs: &[Vector], dir: &Vector) -> usize {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, d) in dirs.iter().enumerate() {
        let c = closeness(dir, d);
        if c > best.1 { best = (i, c) }
    }
    best.0
}
