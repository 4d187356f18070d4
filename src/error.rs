//! Configuration-time failures.
//!
//! Nothing that happens while mapping an individual streamline is an error:
//! out-of-field voxels, degenerate directions and failed factor samples are
//! all recovered locally. Only inconsistent setup ends up here.

use std::path::PathBuf;
use thiserror::Error;

use crate::mapping::PluginKind;
use crate::twi::Statistic;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("precise mapping and endpoints-only mapping are mutually exclusive")]
    ConflictingTraversal,

    #[error("at most one attribute plugin may be attached to a mapper, got: {0:?}")]
    MultiplePlugins(Vec<PluginKind>),

    #[error("{entry} entries need {required}, but the mapper was given {provided}")]
    PluginMismatch {
        entry: &'static str,
        required: String,
        provided: String,
    },

    #[error("upsampling ratio must be at least 1")]
    InvalidUpsampleRatio,

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid direction set: {0}")]
    InvalidDirections(String),

    #[error("invalid fixel dataset: {0}")]
    InvalidFixels(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("the `{statistic}` statistic cannot be used with the {plugin} plugin")]
    IncompatibleStatistic {
        statistic: Statistic,
        plugin: &'static str,
    },

    #[error("{plugin} factors can only be computed per streamline")]
    PerVertexNotSupported { plugin: &'static str },

    #[error("invalid sliding window: {0}")]
    InvalidWindow(String),

    #[error("the configuration needs {0}, which was not supplied")]
    MissingInput(&'static str),

    #[error("Couldn't read config file `{path:?}`")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl MappingError {
    pub(crate) fn grid(message: impl Into<String>) -> Self { Self::InvalidGrid(message.into()) }
    pub(crate) fn image(message: impl Into<String>) -> Self { Self::InvalidImage(message.into()) }
}

pub type Result<T> = std::result::Result<T, MappingError>;
