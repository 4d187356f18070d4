//! Conversion of a single streamline into a `Set` of entries.
//!
//! Three traversals are available:
//!
//! + per vertex: each (upsampled) vertex contributes one unit to its voxel,
//!   along the local tangent;
//! + precise: the Hermite curve through the vertices is cut at every voxel
//!   boundary, which is located by bisection, and each voxel receives the
//!   length of curve inside it;
//! + ends only: the first and last vertices contribute.

use std::marker::PhantomData;
use std::sync::Arc;

use geometry::{Hermite, Upsampler, pad_ends, tangent, unit};
use units::Angle;

use crate::directions::DirectionSet;
use crate::error::{MappingError, Result};
use crate::fixel::FixelDataset;
use crate::grid::Grid;
use crate::index::Index3_i;
use crate::streamline::Streamline;
use crate::twi::{Factors, Twi};
use crate::types::{
    Lengthf32, Point, Vector,
    BISECTION_ACCURACY_FRACTION, HERMITE_TENSION, MAX_BISECTION_ITERATIONS,
};

use super::resolve::{DixelPlugin, FixelPlugin, PluginKind, Resolver, TodPlugin};
use super::voxel::{MappedEntry, Segment, Set};

/// Collects the mapping configuration; `build` checks it for consistency.
#[derive(Clone, Debug)]
pub struct MapperBuilder {
    grid: Grid,
    precise: bool,
    ends_only: bool,
    map_zero: bool,
    upsample_ratio: usize,
    plugins: Vec<Resolver>,
    twi: Option<Twi>,
}

impl MapperBuilder {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            precise: false,
            ends_only: false,
            map_zero: false,
            upsample_ratio: 1,
            plugins: vec![],
            twi: None,
        }
    }

    pub fn precise       (self, yes  : bool ) -> Self { Self { precise       : yes  , ..self } }
    pub fn ends_only     (self, yes  : bool ) -> Self { Self { ends_only     : yes  , ..self } }
    pub fn map_zero      (self, yes  : bool ) -> Self { Self { map_zero      : yes  , ..self } }
    pub fn upsample_ratio(self, ratio: usize) -> Self { Self { upsample_ratio: ratio, ..self } }

    pub fn twi(self, twi: Twi) -> Self { Self { twi: Some(twi), ..self } }

    pub fn dixel(self, directions: Arc<DirectionSet>) -> Self {
        self.plugin(Resolver::Dixel(DixelPlugin::new(directions)))
    }

    pub fn tod(self, lmax: usize) -> Self {
        self.plugin(Resolver::Tod(TodPlugin::new(lmax)))
    }

    pub fn fixel(self, fixels: Arc<FixelDataset>) -> Self {
        self.plugin(Resolver::Fixel(FixelPlugin::new(fixels)))
    }

    pub fn fixel_with_angle(self, fixels: Arc<FixelDataset>, threshold: Angle) -> Self {
        self.plugin(Resolver::Fixel(FixelPlugin::with_angle(fixels, threshold)))
    }

    fn plugin(mut self, resolver: Resolver) -> Self {
        self.plugins.push(resolver);
        self
    }

    pub fn build<E: MappedEntry>(mut self) -> Result<Mapper<E>> {
        if self.precise && self.ends_only { return Err(MappingError::ConflictingTraversal) }
        if self.upsample_ratio == 0       { return Err(MappingError::InvalidUpsampleRatio) }
        if self.plugins.len() > 1 {
            return Err(MappingError::MultiplePlugins(self.plugins.iter().map(Resolver::kind).collect()))
        }
        let resolver = self.plugins.pop();
        let provided = resolver.as_ref().map(Resolver::kind);
        if provided != E::PLUGIN {
            let describe = |kind: Option<PluginKind>| kind.map_or("no plugin".to_string(), |k| k.to_string());
            return Err(MappingError::PluginMismatch {
                entry: E::NAME,
                required: describe(E::PLUGIN),
                provided: describe(provided),
            })
        }
        if let Some(Resolver::Fixel(plugin)) = &resolver {
            let n = plugin.fixels().n;
            if n != self.grid.n {
                return Err(MappingError::InvalidFixels(format!(
                    "fixel index image is {n:?}, mapping grid is {:?}", self.grid.n)))
            }
        }
        let accuracy = BISECTION_ACCURACY_FRACTION * self.grid.min_voxel_size();
        log::debug!("{} mapper on {:?} grid: {}, upsampling x{}{}{}",
                    E::NAME, self.grid.n,
                    if self.precise { "precise" } else if self.ends_only { "ends only" } else { "per vertex" },
                    self.upsample_ratio,
                    provided.map_or(String::new(), |k| format!(", {k}")),
                    self.twi.as_ref().map_or(String::new(), |t| format!(", TWI with {}", t.plugin().name())));
        Ok(Mapper {
            grid: self.grid,
            precise: self.precise,
            ends_only: self.ends_only,
            map_zero: self.map_zero,
            upsampler: Upsampler::new(self.upsample_ratio, HERMITE_TENSION),
            resolver,
            twi: self.twi,
            accuracy_squared: accuracy * accuracy,
            upsampled: vec![],
            entry: PhantomData,
        })
    }
}

/// Maps streamlines onto a grid, producing entries of type `E`.
///
/// Cloning is cheap: large read-only data are shared, and each clone gets its
/// own scratch space, so clones can be handed to separate threads.
#[derive(Clone, Debug)]
pub struct Mapper<E: MappedEntry> {
    grid: Grid,
    precise: bool,
    ends_only: bool,
    map_zero: bool,
    upsampler: Upsampler,
    resolver: Option<Resolver>,
    twi: Option<Twi>,
    accuracy_squared: Lengthf32,
    // Reused between streamlines
    upsampled: Vec<Point>,
    entry: PhantomData<fn() -> E>,
}

impl<E: MappedEntry> Mapper<E> {

    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn is_precise(&self) -> bool { self.precise }
    pub fn is_ends_only(&self) -> bool { self.ends_only }
    pub fn upsample_ratio(&self) -> usize { self.upsampler.ratio() }

    pub fn map(&mut self, streamline: &Streamline) -> Set<E> {
        let mut set = Set::new(streamline.index, streamline.weight);
        if streamline.is_empty() { return set }

        let mut vertex_factors = None;
        if let Some(twi) = &self.twi {
            match twi.evaluate(streamline) {
                Factors::Streamline(factor) => {
                    if factor.is_finite() && factor != 0.0 { set.factor = factor }
                    else if self.map_zero                  { set.factor = 0.0    }
                    else {
                        log::trace!("streamline {}: factor {factor}, not mapped", streamline.index);
                        return set
                    }
                },
                Factors::Vertex(mut factors) => {
                    if self.map_zero {
                        factors.iter_mut().filter(|f| !f.is_finite()).for_each(|f| *f = 0.0);
                    }
                    vertex_factors = Some(self.upsampler.upsample_values(&factors));
                },
            }
        }

        let mut points = std::mem::take(&mut self.upsampled);
        self.upsampler.upsample_into(&streamline.points, &mut points);
        let factors = vertex_factors.as_deref();
        if      self.ends_only { self.voxelise_ends    (&points, factors, &mut set) }
        else if self.precise   { self.voxelise_precise (&points, factors, &mut set) }
        else                   { self.voxelise_vertices(&points, factors, &mut set) }
        self.upsampled = points;

        if set.factor != 1.0 { set.scale(set.factor) }
        set.normalize(!self.precise);
        set
    }

    /// Whether a factor-weighted contribution should be kept
    fn usable(&self, weight: f32) -> bool {
        weight.is_finite() && (weight != 0.0 || self.map_zero)
    }

    fn emit(&self, set: &mut Set<E>, voxel: Index3_i, direction: Vector, length: Lengthf32) {
        let Some(voxel) = self.grid.contains(voxel) else { return };
        let segment = Segment { voxel, direction, length };
        if let Some(entry) = E::from_segment(&segment, self.resolver.as_ref()) {
            set.insert(entry);
        }
    }

    fn voxelise_vertices(&self, points: &[Point], factors: Option<&[f32]>, set: &mut Set<E>) {
        for (i, point) in points.iter().enumerate() {
            let Some(direction) = unit(tangent(points, i)) else { continue };
            let weight = factors.map_or(1.0, |f| f[i]);
            if !self.usable(weight) { continue }
            self.emit(set, self.grid.voxel_of(point), direction, weight);
        }
    }

    fn voxelise_ends(&self, points: &[Point], factors: Option<&[f32]>, set: &mut Set<E>) {
        let n = points.len();
        let weight = |i: usize| factors.map_or(1.0, |f| f[i]);
        if n == 1 {
            if self.usable(weight(0)) {
                self.emit(set, self.grid.voxel_of(&points[0]), Vector::repeat(f32::NAN), weight(0));
            }
            return
        }
        for (end, next) in [(0, 1), (n - 1, n - 2)] {
            let Some(direction) = unit(points[end] - points[next]) else { continue };
            if !self.usable(weight(end)) { continue }
            self.emit(set, self.grid.voxel_of(&points[end]), direction, weight(end));
        }
    }

    fn voxelise_precise(&self, points: &[Point], factors: Option<&[f32]>, set: &mut Set<E>) {
        // Non-finite vertices split the streamline into independently traversed runs
        let n = points.len();
        let mut start = 0;
        for end in (0..=n).filter(|&i| i == n || !is_finite(&points[i])) {
            self.voxelise_run(&points[start..end], factors.map(|f| &f[start..end]), set);
            start = end + 1;
        }
    }

    fn voxelise_run(&self, points: &[Point], factors: Option<&[f32]>, set: &mut Set<E>) {
        let n = points.len();
        if n < 2 { return }
        // Vertex `i` of `points` is `padded[i + 1]`
        let padded = pad_ends(points);
        let mut hermite = Hermite::new(HERMITE_TENSION);
        // Factor applied to pieces of the segment ending at vertex `p`
        let segment_factor = |p: usize| factors.map_or(1.0, |f| 0.5 * (f[p - 1] + f[p]));

        let mut voxel = self.grid.voxel_of(&points[0]);
        let mut entry = points[0];
        let mut prev = points[0];
        // Curve parameter of `prev` within the current segment
        let mut mu = 0.0;
        let mut length = 0.0;
        let mut weighted = 0.0;

        let mut p = 1;
        while p < n {
            let target = points[p];
            let target_voxel = self.grid.voxel_of(&target);
            let factor = segment_factor(p);

            if target_voxel == voxel {
                let step = (target - prev).norm();
                length   += step;
                weighted += step * factor;
                prev = target;
                mu = 0.0;
                p += 1;
                continue;
            }

            // The curve leaves `voxel` between `prev` and `target`
            let control = [&padded[p - 1], &padded[p], &padded[p + 1], &padded[p + 2]];
            let (mut lo, mut hi) = (prev, target);
            let (mut mu_lo, mut mu_hi) = (mu, 1.0);
            let mut next_voxel = target_voxel;
            let mut iterations = 0;
            while (hi - lo).norm_squared() > self.accuracy_squared && iterations < MAX_BISECTION_ITERATIONS {
                let mu_mid = 0.5 * (mu_lo + mu_hi);
                let mid = hermite.at(mu_mid, control);
                let mid_voxel = self.grid.voxel_of(&mid);
                if mid_voxel == voxel {
                    lo = mid;
                    mu_lo = mu_mid;
                } else {
                    hi = mid;
                    mu_hi = mu_mid;
                    next_voxel = mid_voxel;
                }
                iterations += 1;
            }
            let exit = Point::from((lo.coords + hi.coords) * 0.5);
            let step = (exit - prev).norm();
            length   += step;
            weighted += step * factor;
            self.emit_piece(set, voxel, exit - entry, length, weighted);

            voxel = next_voxel;
            entry = exit;
            prev = exit;
            mu = 0.5 * (mu_lo + mu_hi);
            length = 0.0;
            weighted = 0.0;
        }
        self.emit_piece(set, voxel, prev - entry, length, weighted);
    }

    fn emit_piece(&self, set: &mut Set<E>, voxel: Index3_i, chord: Vector, length: Lengthf32, weighted: Lengthf32) {
        if !(length > 0.0) || !self.usable(weighted) { return }
        let Some(direction) = unit(chord) else { return };
        self.emit(set, voxel, direction, weighted);
    }
}

fn is_finite(p: &Point) -> bool { p.coords.iter().all(|c| c.is_finite()) }
