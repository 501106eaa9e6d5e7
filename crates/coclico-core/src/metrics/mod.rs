//! Classification quality metrics.
//!
//! Every metric follows the same two steps. `rasterize` extracts per-class
//! data from one classification of a tile, `tile_stats` compares the
//! candidate and reference extractions into one raw row per class. Raw rows
//! are monoids, so the rows of any number of tiles merge into one row per
//! class, and `note` maps any raw row (single tile or merged) to a score.
pub mod malt0;
pub mod mobj0;
pub mod mpap0;
pub mod mpla0;
pub mod pairing;
pub mod score;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classes::ClassWeights;
use crate::error::{CoclicoError, Result};
use crate::geometry::RasterGrid;
use crate::points::PointCloud;
use crate::stats::AggregateStat;

pub use malt0::{HeightDiffRow, Malt0Config};
pub use mobj0::Mobj0Config;
pub use mpap0::{Mpap0Config, PointCountRow};
pub use mpla0::{Mpla0Config, OccupancyRow};
pub use pairing::{pair_objects, PairingResult};
pub use score::{BoundedAffine, ScoreControlPoint};

/// Pixel size used when a metric section does not set one.
pub const DEFAULT_PIXEL_SIZE: f64 = 0.5;

pub(crate) fn default_pixel_size() -> f64 {
    DEFAULT_PIXEL_SIZE
}

/// Per-class comparison result of one metric. The zero row (`Default`) is
/// the identity of `merge`.
pub trait RawRow: Clone + Default + fmt::Debug + Send + Into<AnyRawRow> {
    fn merge(self, other: Self) -> Self;
}

/// One quality metric, configured.
pub trait Metric: Sync {
    const NAME: &'static str;

    /// Per-class data extracted from one classification of a tile.
    type Intrinsic;
    type Raw: RawRow;

    fn weights(&self) -> &ClassWeights;

    /// Pixel size of the rasters the metric compares, `None` when it works
    /// on points directly.
    fn pixel_size(&self) -> Option<f64>;

    /// Extract per-class data from `cloud`. `grid` is set whenever
    /// [`Metric::pixel_size`] is, and is shared by both classifications.
    fn rasterize(&self, cloud: &PointCloud, grid: Option<&RasterGrid>) -> Result<Self::Intrinsic>;

    /// One raw row per class, in class-key order.
    fn tile_stats(&self, c1: &Self::Intrinsic, reference: &Self::Intrinsic) -> Result<Vec<Self::Raw>>;

    fn note(&self, raw: &Self::Raw) -> Option<f64>;

    fn merge(a: Self::Raw, b: Self::Raw) -> Self::Raw {
        a.merge(b)
    }

    /// Rasterize both classifications of a tile and compare them. Malformed
    /// clouds are rejected before any rasterization.
    fn compare_tile(&self, c1: &PointCloud, reference: &PointCloud) -> Result<Vec<Self::Raw>> {
        c1.validate()?;
        reference.validate()?;
        let grid = match self.pixel_size() {
            Some(p) => Some(shared_grid(&[c1, reference], p)?),
            None => None,
        };
        let c1 = self.rasterize(c1, grid.as_ref())?;
        let reference = self.rasterize(reference, grid.as_ref())?;
        self.tile_stats(&c1, &reference)
    }
}

/// Grid covering every point of every cloud. Empty clouds are skipped; if all
/// are empty there is nothing to rasterize.
pub fn shared_grid(clouds: &[&PointCloud], pixel_size: f64) -> Result<RasterGrid> {
    let bounds = clouds
        .iter()
        .filter_map(|c| c.bounds())
        .reduce(|a, b| crate::points::BoundingBox {
            xmin: a.xmin.min(b.xmin),
            ymin: a.ymin.min(b.ymin),
            xmax: a.xmax.max(b.xmax),
            ymax: a.ymax.max(b.ymax),
        })
        .ok_or_else(|| CoclicoError::InvalidGeometry("tile has no points".to_string()))?;
    RasterGrid::covering(bounds, pixel_size)
}

pub(crate) fn require_grid<'a>(metric: &str, grid: Option<&'a RasterGrid>) -> Result<&'a RasterGrid> {
    grid.ok_or_else(|| CoclicoError::InvalidGeometry(format!("{metric} needs a raster grid")))
}

/// Pick the note function by comparing a reference size with its threshold.
///
/// `size >= threshold` selects the above-threshold regime and its (possibly
/// undefined) ratio; otherwise the under-threshold regime scores an absolute
/// quantity.
pub(crate) fn two_regime_note(
    size: u64,
    threshold: u64,
    above: &BoundedAffine,
    under: &BoundedAffine,
    ratio: impl FnOnce() -> Option<f64>,
    absolute: f64,
) -> Option<f64> {
    if size >= threshold {
        above.score_opt(ratio())
    } else {
        under.score_opt(Some(absolute))
    }
}

/// Raw row of any metric, as written in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyRawRow {
    PointCount(PointCountRow),
    Occupancy(OccupancyRow),
    HeightDiff(AggregateStat),
    Pairing(PairingResult),
}

/// Metric identifier, as used in configuration files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Mpap0,
    Mpla0,
    Malt0,
    Mobj0,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [Self::Mpap0, Self::Mpla0, Self::Malt0, Self::Mobj0];

    pub fn name(self) -> &'static str {
        match self {
            Self::Mpap0 => Mpap0Config::NAME,
            Self::Mpla0 => Mpla0Config::NAME,
            Self::Malt0 => Malt0Config::NAME,
            Self::Mobj0 => Mobj0Config::NAME,
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| CoclicoError::UnknownMetric(name.to_string()))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = CoclicoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}
