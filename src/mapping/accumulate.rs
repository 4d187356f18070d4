//! Parallel mapping of many streamlines, and simple accumulators of the
//! resulting `Set`s.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::grid::Grid;
use crate::index::index3_to_1;
use crate::streamline::Streamline;
use crate::utils::group_digits;

use super::mapper::Mapper;
use super::voxel::{Fixel, MappedEntry, Set};

/// Consumer of the `Set`s produced by a mapper. Each worker owns one, and the
/// workers' accumulators are combined at the end.
pub trait Accumulator<E: MappedEntry>: Clone + Send {
    fn merge(&mut self, set: &Set<E>);
    fn combine(self, other: Self) -> Self;
}

/// Map all `streamlines` with clones of `mapper`, merging the results into
/// copies of `empty`.
///
/// Rayon is kept from splitting the work into jobs smaller than `job_size`
/// streamlines, as each job needs its own accumulator.
pub fn map_streamlines<E, A>(
    mapper     : &Mapper<E>,
    streamlines: &[Streamline],
    job_size   : usize,
    empty      : A,
    progress   : bool,
) -> A
where
    E: MappedEntry,
    A: Accumulator<E> + Sync,
{
    let bar = if progress { ProgressBar::new(streamlines.len() as u64) }
              else        { ProgressBar::hidden() };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("Mapping streamlines\n[{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})") {
        bar.set_style(style);
    }

    // Called by `fold` at the start of every job
    let initial_job_state = || (mapper.clone(), empty.clone(), 0_usize);

    let (accumulated, n_mapped) = streamlines
        .par_iter()
        .with_min_len(job_size.max(1))
        .with_max_len(job_size.max(1))
        .fold(initial_job_state, |(mut mapper, mut acc, mut n_mapped), streamline| {
            let set = mapper.map(streamline);
            if !set.is_empty() { n_mapped += 1 }
            acc.merge(&set);
            bar.inc(1);
            (mapper, acc, n_mapped)
        })
        .map(|(_, acc, n_mapped)| (acc, n_mapped))
        .reduce(|| (empty.clone(), 0), |(a, na), (b, nb)| (a.combine(b), na + nb));

    bar.finish_and_clear();
    log::info!("{} of {} streamlines contributed to the {} map",
               group_digits(n_mapped), group_digits(streamlines.len()), E::NAME);
    accumulated
}

/// Total weighted length of streamline per voxel: a track density image
#[derive(Clone, Debug, PartialEq)]
pub struct TrackDensity {
    pub grid: Grid,
    pub data: Vec<f32>,
}

impl TrackDensity {
    pub fn new(grid: Grid) -> Self {
        let data = vec![0.0; grid.nvoxels()];
        Self { grid, data }
    }

    pub fn total(&self) -> f32 { self.data.iter().sum() }
}

macro_rules! voxel_density {
    ($($entry:ident)*) => {$(
        impl Accumulator<super::voxel::$entry> for TrackDensity {
            fn merge(&mut self, set: &Set<super::voxel::$entry>) {
                for entry in set.iter() {
                    self.data[index3_to_1(entry.voxel, self.grid.n)] += entry.length() * set.weight;
                }
            }
            fn combine(self, other: Self) -> Self { elementwise_add(self, other) }
        }
    )*};
}

voxel_density!(Voxel VoxelDec VoxelDir VoxelTod Dixel);

fn elementwise_add(mut a: TrackDensity, b: TrackDensity) -> TrackDensity {
    a.data.iter_mut().zip(b.data).for_each(|(l, r)| *l += r);
    a
}

/// Total weighted length of streamline per fixel
#[derive(Clone, Debug, PartialEq)]
pub struct FixelDensity {
    pub data: Vec<f32>,
}

impl FixelDensity {
    pub fn new(n_fixels: usize) -> Self { Self { data: vec![0.0; n_fixels] } }
}

impl Accumulator<Fixel> for FixelDensity {
    fn merge(&mut self, set: &Set<Fixel>) {
        for entry in set.iter() {
            self.data[entry.fixel] += entry.length * set.weight;
        }
    }

    fn combine(mut self, other: Self) -> Self {
        self.data.iter_mut().zip(other.data).for_each(|(l, r)| *l += r);
        self
    }
}
