//! Turning streamlines into sets of voxel, dixel, TOD or fixel contributions

pub mod accumulate;
pub mod mapper;
pub mod resolve;
pub mod voxel;

pub use accumulate::{Accumulator, FixelDensity, TrackDensity, map_streamlines};
pub use mapper::{Mapper, MapperBuilder};
pub use resolve::{DixelPlugin, FixelPlugin, PluginKind, Resolve, Resolver, TodPlugin};
pub use voxel::{Dixel, Fixel, MappedEntry, Segment, Set, Voxel, VoxelDec, VoxelDir, VoxelTod};
