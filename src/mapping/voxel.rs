//! Entries produced by mapping one streamline, and the `Set` that collects
//! them.
//!
//! Every entry kind carries the length of streamline attributed to it and the
//! number of contributions that were merged into it. Inserting an entry whose
//! key is already present merges the two according to the kind's own rule.

use std::collections::hash_map::{Entry, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use crate::index::Index3_u;
use crate::types::{Lengthf32, Vector, Weightf32};

use super::resolve::{PluginKind, Resolver, Resolve};

/// One contribution found by traversal: a piece of streamline of (factor
/// weighted) `length` inside `voxel`, heading along `direction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub voxel: Index3_u,
    pub direction: Vector,
    pub length: Lengthf32,
}

pub trait MappedEntry: Clone + Debug + Send + Sync {
    type Key: Copy + Eq + Hash + Debug + Send + Sync;

    /// Human-readable name, for diagnostics
    const NAME: &'static str;

    /// Attribute plugin which must be attached to the mapper
    const PLUGIN: Option<PluginKind> = None;

    /// `None` when the contribution cannot be attributed (for example, no
    /// fixel is sufficiently aligned)
    fn from_segment(segment: &Segment, resolver: Option<&Resolver>) -> Option<Self>;

    fn key(&self) -> Self::Key;
    fn length(&self) -> Lengthf32;
    fn count(&self) -> u32;

    fn absorb(&mut self, other: Self);

    /// Multiply by a per-streamline factor
    fn scale(&mut self, factor: f32);

    /// Final tidying once all contributions have been merged. With
    /// `average_visits`, accumulated quantities are divided by the number of
    /// contributions.
    fn normalize(&mut self, average_visits: bool);
}

// ----- Voxel --------------------------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voxel {
    pub voxel: Index3_u,
    pub length: Lengthf32,
    pub count: u32,
}

impl MappedEntry for Voxel {
    type Key = Index3_u;
    const NAME: &'static str = "voxel";

    fn from_segment(s: &Segment, _: Option<&Resolver>) -> Option<Self> {
        Some(Self { voxel: s.voxel, length: s.length, count: 1 })
    }

    fn key   (&self) -> Index3_u  { self.voxel  }
    fn length(&self) -> Lengthf32 { self.length }
    fn count (&self) -> u32       { self.count  }

    fn absorb(&mut self, other: Self) {
        self.length += other.length;
        self.count  += other.count;
    }

    fn scale(&mut self, factor: f32) { self.length *= factor; }

    fn normalize(&mut self, average_visits: bool) {
        if average_visits { self.length /= self.count as f32 }
    }
}

// ----- Voxel with directionally-encoded colour --------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelDec {
    pub voxel: Index3_u,
    /// Sum of `|direction| * length`, not normalized
    pub colour: Vector,
    pub length: Lengthf32,
    pub count: u32,
}

impl VoxelDec {
    /// Colour as a unit RGB triplet, black if nothing was accumulated
    pub fn colour_normalized(&self) -> Vector {
        geometry::unit(self.colour).unwrap_or_else(Vector::zeros)
    }
}

impl MappedEntry for VoxelDec {
    type Key = Index3_u;
    const NAME: &'static str = "DEC voxel";

    fn from_segment(s: &Segment, _: Option<&Resolver>) -> Option<Self> {
        let colour = if s.direction.iter().all(|c| c.is_finite()) { s.direction.abs() * s.length }
                     else                                          { Vector::zeros() };
        Some(Self { voxel: s.voxel, colour, length: s.length, count: 1 })
    }

    fn key   (&self) -> Index3_u  { self.voxel  }
    fn length(&self) -> Lengthf32 { self.length }
    fn count (&self) -> u32       { self.count  }

    fn absorb(&mut self, other: Self) {
        self.colour += other.colour;
        self.length += other.length;
        self.count  += other.count;
    }

    fn scale(&mut self, factor: f32) {
        self.colour *= factor;
        self.length *= factor;
    }

    fn normalize(&mut self, average_visits: bool) {
        if average_visits {
            let n = self.count as f32;
            self.colour /= n;
            self.length /= n;
        }
    }
}

// ----- Voxel with a signed mean direction -------------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelDir {
    pub voxel: Index3_u,
    /// Length-weighted sum of directions while merging; unit after `normalize`
    pub dir: Vector,
    pub length: Lengthf32,
    pub count: u32,
}

impl MappedEntry for VoxelDir {
    type Key = Index3_u;
    const NAME: &'static str = "directional voxel";

    fn from_segment(s: &Segment, _: Option<&Resolver>) -> Option<Self> {
        let dir = if s.direction.iter().all(|c| c.is_finite()) { s.direction * s.length }
                  else                                          { Vector::zeros() };
        Some(Self { voxel: s.voxel, dir, length: s.length, count: 1 })
    }

    fn key   (&self) -> Index3_u  { self.voxel  }
    fn length(&self) -> Lengthf32 { self.length }
    fn count (&self) -> u32       { self.count  }

    fn absorb(&mut self, other: Self) {
        // Directions are axes: flip to agree with what has been accumulated
        if self.dir.dot(&other.dir) < 0.0 { self.dir -= other.dir }
        else                              { self.dir += other.dir }
        self.length += other.length;
        self.count  += other.count;
    }

    fn scale(&mut self, factor: f32) { self.length *= factor; }

    fn normalize(&mut self, average_visits: bool) {
        if let Some(unit) = geometry::unit(self.dir) { self.dir = unit }
        if average_visits { self.length /= self.count as f32 }
    }
}

// ----- Dixel --------------------------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dixel {
    pub voxel: Index3_u,
    pub bin: usize,
    pub length: Lengthf32,
    pub count: u32,
}

impl MappedEntry for Dixel {
    type Key = (Index3_u, usize);
    const NAME: &'static str = "dixel";
    const PLUGIN: Option<PluginKind> = Some(PluginKind::Dixel);

    fn from_segment(s: &Segment, resolver: Option<&Resolver>) -> Option<Self> {
        let Some(Resolver::Dixel(plugin)) = resolver else { return None };
        let bin = plugin.resolve(s.voxel, &s.direction)?;
        Some(Self { voxel: s.voxel, bin, length: s.length, count: 1 })
    }

    fn key   (&self) -> (Index3_u, usize) { (self.voxel, self.bin) }
    fn length(&self) -> Lengthf32         { self.length }
    fn count (&self) -> u32               { self.count  }

    fn absorb(&mut self, other: Self) {
        self.length += other.length;
        self.count  += other.count;
    }

    fn scale(&mut self, factor: f32) { self.length *= factor; }

    fn normalize(&mut self, average_visits: bool) {
        if average_visits { self.length /= self.count as f32 }
    }
}

// ----- Track orientation distribution ------------------------------------------
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelTod {
    pub voxel: Index3_u,
    /// Even-degree SH coefficients: sum of aPSF(direction) * length
    pub tod: Vec<f32>,
    pub length: Lengthf32,
    pub count: u32,
}

impl MappedEntry for VoxelTod {
    type Key = Index3_u;
    const NAME: &'static str = "TOD voxel";
    const PLUGIN: Option<PluginKind> = Some(PluginKind::Tod);

    fn from_segment(s: &Segment, resolver: Option<&Resolver>) -> Option<Self> {
        let Some(Resolver::Tod(plugin)) = resolver else { return None };
        let mut tod = plugin.resolve(s.voxel, &s.direction)?;
        tod.iter_mut().for_each(|c| *c *= s.length);
        Some(Self { voxel: s.voxel, tod, length: s.length, count: 1 })
    }

    fn key   (&self) -> Index3_u  { self.voxel  }
    fn length(&self) -> Lengthf32 { self.length }
    fn count (&self) -> u32       { self.count  }

    fn absorb(&mut self, other: Self) {
        for (mine, theirs) in self.tod.iter_mut().zip(other.tod) { *mine += theirs }
        self.length += other.length;
        self.count  += other.count;
    }

    fn scale(&mut self, factor: f32) {
        self.tod.iter_mut().for_each(|c| *c *= factor);
        self.length *= factor;
    }

    fn normalize(&mut self, average_visits: bool) {
        if average_visits {
            let n = self.count as f32;
            self.tod.iter_mut().for_each(|c| *c /= n);
            self.length /= n;
        }
    }
}

// ----- Fixel --------------------------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fixel {
    pub fixel: usize,
    pub length: Lengthf32,
    pub count: u32,
}

impl MappedEntry for Fixel {
    type Key = usize;
    const NAME: &'static str = "fixel";
    const PLUGIN: Option<PluginKind> = Some(PluginKind::Fixel);

    fn from_segment(s: &Segment, resolver: Option<&Resolver>) -> Option<Self> {
        let Some(Resolver::Fixel(plugin)) = resolver else { return None };
        let fixel = plugin.resolve(s.voxel, &s.direction)?;
        Some(Self { fixel, length: s.length, count: 1 })
    }

    fn key   (&self) -> usize     { self.fixel  }
    fn length(&self) -> Lengthf32 { self.length }
    fn count (&self) -> u32       { self.count  }

    fn absorb(&mut self, other: Self) {
        self.length += other.length;
        self.count  += other.count;
    }

    fn scale(&mut self, factor: f32) { self.length *= factor; }

    fn normalize(&mut self, average_visits: bool) {
        if average_visits { self.length /= self.count as f32 }
    }
}

// ----- Set ----------------------------------------------------------------------

/// All entries produced by mapping one streamline, deduplicated by key
#[derive(Clone, Debug)]
pub struct Set<E: MappedEntry> {
    entries: HashMap<E::Key, E>,
    /// Position of the streamline in its input stream
    pub index: usize,
    /// Weight of the streamline
    pub weight: Weightf32,
    /// Per-streamline TWI factor, already applied to the entries; 1 without
    /// TWI
    pub factor: f32,
}

impl<E: MappedEntry> Default for Set<E> {
    fn default() -> Self { Self::new(0, 1.0) }
}

impl<E: MappedEntry> Set<E> {
    pub fn new(index: usize, weight: Weightf32) -> Self {
        Self { entries: HashMap::new(), index, weight, factor: 1.0 }
    }

    pub fn insert(&mut self, entry: E) {
        match self.entries.entry(entry.key()) {
            Entry::Occupied(mut existing) => existing.get_mut().absorb(entry),
            Entry::Vacant  (slot)         => { slot.insert(entry); },
        }
    }

    pub fn len     (&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool  { self.entries.is_empty() }

    pub fn get(&self, key: &E::Key) -> Option<&E> { self.entries.get(key) }

    pub fn iter(&self) -> impl Iterator<Item = &E> { self.entries.values() }

    pub fn total_length(&self) -> Lengthf32 { self.iter().map(E::length).sum() }

    pub(crate) fn scale(&mut self, factor: f32) {
        self.entries.values_mut().for_each(|e| e.scale(factor));
    }

    pub(crate) fn normalize(&mut self, average_visits: bool) {
        self.entries.values_mut().for_each(|e| e.normalize(average_visits));
    }
}

impl<E: MappedEntry> IntoIterator for Set<E> {
    type Item = E;
    type IntoIter = std::collections::hash_map::IntoValues<E::Key, E>;
    fn into_iter(self) -> Self::IntoIter { self.entries.into_values() }
}

impl<E: MappedEntry> Extend<E> for Set<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, entries: I) {
        entries.into_iter().for_each(|e| self.insert(e));
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn segment(voxel: Index3_u, (x, y, z): (f32, f32, f32), length: f32) -> Segment {
        Segment { voxel, direction: Vector::new(x, y, z).normalize(), length }
    }

    #[test]
    fn inserting_existing_key_merges() {
        let mut set = Set::<Voxel>::new(3, 0.5);
        set.extend([
            Voxel::from_segment(&segment([1, 2, 3], (1.0, 0.0, 0.0), 0.25), None).unwrap(),
            Voxel::from_segment(&segment([1, 2, 3], (0.0, 1.0, 0.0), 0.50), None).unwrap(),
            Voxel::from_segment(&segment([1, 2, 4], (0.0, 1.0, 0.0), 1.00), None).unwrap(),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&[1, 2, 3]), Some(&Voxel { voxel: [1, 2, 3], length: 0.75, count: 2 }));
        assert_float_eq!(set.total_length(), 1.75, ulps <= 1);
        assert_eq!((set.index, set.weight, set.factor), (3, 0.5, 1.0));
    }

    #[rstest(/**/ average, expected_length,
             case(false, 3.0),
             case(true , 1.5),
    )]
    fn normalization(average: bool, expected_length: f32) {
        let mut set = Set::<Voxel>::default();
        set.insert(Voxel { voxel: [0, 0, 0], length: 1.0, count: 1 });
        set.insert(Voxel { voxel: [0, 0, 0], length: 2.0, count: 1 });
        set.normalize(average);
        assert_eq!(set.get(&[0, 0, 0]).unwrap().length, expected_length);
    }

    #[test]
    fn dec_colour_accumulates_absolute_direction() {
        let mut e = VoxelDec::from_segment(&segment([0, 0, 0], (-1.0, 0.0, 0.0), 2.0), None).unwrap();
        e.absorb(VoxelDec::from_segment(&segment([0, 0, 0], (0.0, 0.0, 1.0), 1.0), None).unwrap());
        assert_eq!(e.colour, Vector::new(2.0, 0.0, 1.0));
        e.normalize(false);
        assert_eq!(e.colour, Vector::new(2.0, 0.0, 1.0));
        assert_float_eq!(e.colour_normalized().norm(), 1.0, ulps <= 1);
    }

    #[test]
    fn undefined_direction_leaves_colour_black() {
        let e = VoxelDec::from_segment(&Segment { voxel: [0, 0, 0], direction: Vector::repeat(f32::NAN), length: 1.0 }, None).unwrap();
        assert_eq!(e.colour, Vector::zeros());
        assert_eq!(e.colour_normalized(), Vector::zeros());
    }

    #[test]
    fn signed_directions_are_aligned_before_summing() {
        let mut e = VoxelDir::from_segment(&segment([0, 0, 0], ( 1.0, 0.0, 0.0), 1.0), None).unwrap();
        e.absorb(VoxelDir::from_segment(&segment([0, 0, 0], (-1.0, 0.1, 0.0), 1.0), None).unwrap());
        e.normalize(false);
        assert!(e.dir.x > 0.99, "{:?}", e.dir);
        assert_float_eq!(e.dir.norm(), 1.0, abs <= 1e-6);
        assert_float_eq!(e.length, 2.0, ulps <= 1);
    }

    #[test]
    fn plugin_entries_need_their_resolver() {
        let s = segment([0, 0, 0], (1.0, 0.0, 0.0), 1.0);
        assert_eq!(Dixel::from_segment(&s, None), None);
        assert_eq!(Fixel::from_segment(&s, None), None);
        assert_eq!(VoxelTod::from_segment(&s, None), None);
        let tod = Resolver::Tod(super::super::resolve::TodPlugin::new(4));
        let mut e = VoxelTod::from_segment(&Segment { length: 2.0, ..s }, Some(&tod)).unwrap();
        assert_float_eq!(crate::sh::value(&e.tod, &Vector::x()), 2.0, abs <= 1e-4);
        e.scale(0.5);
        assert_float_eq!(crate::sh::value(&e.tod, &Vector::x()), 1.0, abs <= 1e-4);
        assert_eq!(Dixel::from_segment(&s, Some(&tod)), None);
    }
}
