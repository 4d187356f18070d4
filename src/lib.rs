//! Mapping of streamlines (tractography output) onto voxel grids: track
//! density, directionally-encoded colour, dixel, TOD and fixel maps, with
//! optional track-weighting factors.

mod types;
pub use types::*;

pub mod error;
pub mod index;
pub mod grid;
pub mod streamline;
pub mod image;
pub mod directions;
pub mod fixel;
pub mod sh;
pub mod mapping;
pub mod twi;
pub mod config;
pub mod utils;

pub use error::{MappingError, Result};
pub use grid::Grid;
pub use streamline::Streamline;
pub use image::Image;
pub use directions::DirectionSet;
pub use fixel::FixelDataset;
pub use mapping::{Mapper, MapperBuilder, Set};
pub use twi::{FactorMode, FactorPlugin, Statistic, Twi};
