//! Track-weighted imaging: a factor, loaded from an auxiliary image, by which
//! the contributions of each streamline are multiplied.
//!
//! The factor is either one value for the whole streamline, obtained by
//! reducing per-vertex samples (or endpoint samples) with a `Statistic`, or
//! one value per vertex.

pub mod plugins;
pub mod stats;

pub use plugins::{
    End, FactorPlugin, Kernel, KernelShape,
    ScalarPlugin, FodPlugin, StaticFcPlugin, DynamicFcPlugin, TimeSeriesImage,
    end_index,
};

use serde::Deserialize;

use crate::error::{MappingError, Result};
use crate::streamline::Streamline;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Sum, Min, Mean, Max, Median,
    EndsMin, EndsMean, EndsMax, EndsProd,
    EndsCorr,
}

impl Statistic {
    pub const ALL: [Statistic; 10] = {
        use Statistic::*;
        [Sum, Min, Mean, Max, Median, EndsMin, EndsMean, EndsMax, EndsProd, EndsCorr]
    };

    pub fn name(&self) -> &'static str {
        use Statistic::*;
        match self {
            Sum      => "sum",
            Min      => "min",
            Mean     => "mean",
            Max      => "max",
            Median   => "median",
            EndsMin  => "ends_min",
            EndsMean => "ends_mean",
            EndsMax  => "ends_max",
            EndsProd => "ends_prod",
            EndsCorr => "ends_corr",
        }
    }

    /// Uses only the samples at the two ends of the streamline
    pub fn uses_ends(&self) -> bool {
        use Statistic::*;
        matches!(self, EndsMin | EndsMean | EndsMax | EndsProd | EndsCorr)
    }

    /// Reduce per-vertex samples, weighted by the length each vertex stands
    /// for
    pub fn reduce_vertices(&self, values: &[f32], weights: &[f32]) -> f32 {
        use Statistic::*;
        match self {
            Sum    => stats::sum(values),
            Min    => stats::min(values),
            Max    => stats::max(values),
            Mean   => stats::weighted_mean(values, weights),
            Median => stats::weighted_median(values, weights),
            _      => f32::NAN,
        }
    }

    /// Combine the samples at the two ends; NaN if either is missing
    pub fn combine_ends(&self, [a, b]: [f32; 2]) -> f32 {
        use Statistic::*;
        if !(a.is_finite() && b.is_finite()) { return f32::NAN }
        match self {
            EndsMin  => a.min(b),
            EndsMax  => a.max(b),
            EndsMean => 0.5 * (a + b),
            EndsProd => a * b,
            _        => f32::NAN,
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Statistic {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Statistic::ALL.iter()
            .find(|stat| stat.name() == s)
            .cloned()
            .ok_or_else(|| format!("unknown statistic `{s}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactorMode {
    /// One factor per streamline
    Streamline(Statistic),
    /// One factor per vertex, applied to each length contribution
    Vertex,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Factors {
    Streamline(f32),
    Vertex(Vec<f32>),
}

/// A factor plugin together with the way its samples become factors
#[derive(Clone, Debug)]
pub struct Twi {
    plugin: FactorPlugin,
    mode: FactorMode,
}

impl Twi {
    pub fn new(plugin: FactorPlugin, mode: FactorMode) -> Result<Self> {
        let name = plugin.name();
        match mode {
            FactorMode::Vertex if plugin.is_connectivity() =>
                return Err(MappingError::PerVertexNotSupported { plugin: name }),
            FactorMode::Streamline(statistic) if (statistic == Statistic::EndsCorr) != plugin.is_connectivity() =>
                return Err(MappingError::IncompatibleStatistic { statistic, plugin: name }),
            _ => (),
        }
        if let FactorPlugin::DynamicFc(p) = &plugin {
            if p.centres().len() != 1 {
                return Err(MappingError::InvalidWindow(format!(
                    "a track-weighting factor needs exactly one window centre, got {}", p.centres().len())))
            }
        }
        log::debug!("TWI: {} plugin, {:?}", name, mode);
        Ok(Self { plugin, mode })
    }

    pub fn plugin(&self) -> &FactorPlugin { &self.plugin }
    pub fn mode  (&self) -> FactorMode    {  self.mode   }

    /// Factor(s) for one streamline. Failures show up as NaN.
    pub fn evaluate(&self, streamline: &Streamline) -> Factors {
        let points = &streamline.points;
        match self.mode {
            FactorMode::Vertex => Factors::Vertex(self.plugin.vertices(points)),
            FactorMode::Streamline(Statistic::EndsCorr) =>
                Factors::Streamline(self.plugin.correlation(points)),
            FactorMode::Streamline(statistic) if statistic.uses_ends() =>
                Factors::Streamline(statistic.combine_ends(self.plugin.ends(points))),
            FactorMode::Streamline(statistic) => {
                let values = self.plugin.vertices(points);
                let weights = stats::vertex_weights(points);
                Factors::Streamline(statistic.reduce_vertices(&values, &weights))
            }
        }
    }
}
