//! Configuration file parser for streamline mapping

use std::fs;
use std::str::FromStr;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, de};

use units::{Angle, Length, mm_};

use crate::directions::DirectionSet;
use crate::error::{MappingError, Result};
use crate::fixel::FixelDataset;
use crate::grid::Grid;
use crate::image::Image;
use crate::mapping::MapperBuilder;
use crate::twi::{FactorMode, FactorPlugin, FodPlugin, ScalarPlugin, Statistic, StaticFcPlugin, TimeSeriesImage, Twi};
use crate::types::{Point, Vector};

fn deserialize_uom_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<&str>::deserialize(deserializer)?
        .map(str::parse::<T>)
        .transpose()
        .map_err(de::Error::custom)
}

fn deserialize_uom_3d_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<(T, T, T)>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<(&str, &str, &str)>::deserialize(deserializer)?
        .map(|(x,y,z)| tr_tup_res((x.parse(), y.parse(), z.parse())))
        .transpose()
        .map_err(de::Error::custom)
}

fn deserialize_uom_3d<'d, D, T>(deserializer: D) -> std::result::Result<(T, T, T), D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let (x, y, z) = <(&str, &str, &str)>::deserialize(deserializer)?;
    tr_tup_res((x.parse(), y.parse(), z.parse())).map_err(de::Error::custom)
}

/// Transpose 3-tuple of `Result`
///
/// `Ok` if all elements `Ok`; if any element is an `Err` return the first one.
///
/// # Examples
/// `(Ok(a),  Ok(b),  Ok(c)) -> Ok((a, b, c))`
/// `(Ok(a), Err(b),  Ok(c)) -> Err(b)`
/// `(Ok(a), Err(b), Err(c)) -> Err(b)`
fn tr_tup_res<O, E>((x,y,z): (std::result::Result<O, E>, std::result::Result<O, E>, std::result::Result<O, E>))
                    -> std::result::Result<(O, O, O), E> {
    Ok((x?, y?, z?))
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MapperConfig {

    /// Cut the Hermite curve at voxel boundaries instead of counting vertices
    #[serde(default)]
    pub precise: bool,

    /// Map only the two endpoints of each streamline
    #[serde(default)]
    pub ends_only: bool,

    /// Keep streamlines whose factor is zero or could not be computed
    #[serde(default)]
    pub map_zero: bool,

    #[serde(default = "default_upsample_ratio")]
    pub upsample_ratio: usize,

    pub nvoxels: (usize, usize, usize),

    #[serde(deserialize_with = "deserialize_uom_3d")]
    pub voxel_size: (Length, Length, Length),

    /// Position of the centre of voxel `[0,0,0]`; the grid is centred on the
    /// scanner origin when absent
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_3d_opt")]
    pub origin: Option<(Length, Length, Length)>,

    pub dixel: Option<DixelSection>,
    pub tod  : Option<TodSection>,
    pub fixel: Option<FixelSection>,
    pub twi  : Option<TwiSection>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DixelSection {
    /// Number of directions, spread evenly over a hemisphere
    pub directions: usize,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TodSection {
    pub lmax: usize,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FixelSection {
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_opt")]
    pub angle: Option<Angle>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TwiKind { Scalar, Fod, StaticFc }

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TwiSection {
    pub plugin: TwiKind,

    /// Absent means one factor per vertex
    pub statistic: Option<Statistic>,

    #[serde(default)]
    pub backtrack: bool,
}

fn default_upsample_ratio() -> usize { 1 }

/// Data that cannot be described in a config file, but which some sections
/// need.
#[derive(Clone, Debug, Default)]
pub struct Inputs {
    pub fixels: Option<Arc<FixelDataset>>,
    pub twi_image: Option<Arc<Image>>,
}

impl MapperConfig {

    pub fn grid(&self) -> Result<Grid> {
        let (nx, ny, nz) = self.nvoxels;
        let (dx, dy, dz) = self.voxel_size;
        match self.origin {
            Some((x, y, z)) => Grid::axis_aligned(
                [nx, ny, nz],
                Vector::new(mm_(dx), mm_(dy), mm_(dz)),
                Point::new(mm_(x), mm_(y), mm_(z)),
            ),
            None => Grid::centred(
                (mm_(dx) * nx as f32, mm_(dy) * ny as f32, mm_(dz) * nz as f32),
                (nx, ny, nz),
            ),
        }
    }

    pub fn builder(&self, inputs: Inputs) -> Result<MapperBuilder> {
        let mut builder = MapperBuilder::new(self.grid()?)
            .precise(self.precise)
            .ends_only(self.ends_only)
            .map_zero(self.map_zero)
            .upsample_ratio(self.upsample_ratio);

        if let Some(DixelSection { directions }) = self.dixel {
            builder = builder.dixel(Arc::new(DirectionSet::fibonacci(directions)?));
        }
        if let Some(TodSection { lmax }) = self.tod {
            builder = builder.tod(lmax);
        }
        if let Some(FixelSection { angle }) = self.fixel {
            let fixels = inputs.fixels.clone().ok_or(MappingError::MissingInput("a fixel dataset"))?;
            builder = match angle {
                Some(angle) => builder.fixel_with_angle(fixels, angle),
                None        => builder.fixel(fixels),
            };
        }
        if let Some(twi) = &self.twi {
            let image = inputs.twi_image.ok_or(MappingError::MissingInput("a track-weighting image"))?;
            let plugin = match twi.plugin {
                TwiKind::Scalar   => FactorPlugin::Scalar(ScalarPlugin::new(image, twi.backtrack)?),
                TwiKind::Fod      => FactorPlugin::Fod   (FodPlugin   ::new(image, twi.backtrack)?),
                TwiKind::StaticFc => {
                    let series = TimeSeriesImage::new(Arc::unwrap_or_clone(image))?;
                    FactorPlugin::StaticFc(StaticFcPlugin::new(Arc::new(series), twi.backtrack))
                },
            };
            let mode = twi.statistic.map_or(FactorMode::Vertex, FactorMode::Streamline);
            builder = builder.twi(Twi::new(plugin, mode)?);
        }
        Ok(builder)
    }
}

pub fn read_config_file(path: impl AsRef<Path>) -> Result<MapperConfig> {
    let path = path.as_ref();
    let config: String = fs::read_to_string(path)
        .map_err(|source| MappingError::ConfigRead { path: path.to_path_buf(), source })?;
    Ok(toml::from_str(&config)?)
}
