//! MALT0: height of every class.
//!
//! Both classifications are turned into per-class height maps on a shared
//! grid. Wherever the reference occupies a pixel, the absolute height
//! difference between the maps is accumulated into streaming statistics;
//! max, mean and standard deviation of the difference are then scored
//! separately and blended with configurable coefficients.
use log::debug;
use serde::{Deserialize, Serialize};

use super::{default_pixel_size, require_grid, AnyRawRow, BoundedAffine, Metric, RawRow, ScoreControlPoint};
use crate::classes::ClassWeights;
use crate::error::{CoclicoError, Result};
use crate::geometry::RasterGrid;
use crate::points::PointCloud;
use crate::raster::height::heights_on_grid;
use crate::raster::occupancy::occupancy_on_grid;
use crate::raster::{HeightRaster, OccupancyRaster};
use crate::stats::{stat_of_raster, AggregateStat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Malt0Config {
    pub weights: ClassWeights,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: f64,
    /// Difference assigned to reference pixels where the candidate has no
    /// height for the class. Such pixels are skipped when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_height_diff: Option<f64>,
    pub notes: Malt0Notes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Malt0Notes {
    pub max_diff: SubNote,
    pub mean_diff: SubNote,
    pub std_diff: SubNote,
}

/// Scoring of one statistic of the height difference and its share of the
/// blended note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SubNoteFields", into = "SubNoteFields")]
pub struct SubNote {
    pub coefficient: f64,
    pub function: BoundedAffine,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubNoteFields {
    coefficient: f64,
    min_point: ScoreControlPoint,
    max_point: ScoreControlPoint,
}

impl TryFrom<SubNoteFields> for SubNote {
    type Error = CoclicoError;

    fn try_from(f: SubNoteFields) -> Result<Self> {
        Ok(Self {
            coefficient: f.coefficient,
            function: BoundedAffine::new(f.min_point, f.max_point)?,
        })
    }
}

impl From<SubNote> for SubNoteFields {
    fn from(s: SubNote) -> Self {
        Self {
            coefficient: s.coefficient,
            min_point: s.function.min_point(),
            max_point: s.function.max_point(),
        }
    }
}

impl Malt0Notes {
    fn parts(&self) -> [&SubNote; 3] {
        [&self.max_diff, &self.mean_diff, &self.std_diff]
    }

    pub fn coefficient_sum(&self) -> f64 {
        self.parts().iter().map(|s| s.coefficient).sum()
    }

    /// `Σ coef_i · note_i / Σ coef_i`; `None` as soon as one statistic is
    /// undefined.
    pub fn blend(&self, diffs: &HeightDiffRow) -> Option<f64> {
        let total = self.coefficient_sum();
        if total <= 0.0 {
            return None;
        }
        let values = [diffs.max_diff, diffs.mean_diff, diffs.std_diff];
        let mut weighted = 0.0;
        for (part, value) in self.parts().into_iter().zip(values) {
            weighted += part.coefficient * part.function.score_opt(value)?;
        }
        Some(weighted / total)
    }
}

/// Statistics of the absolute height difference of one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeightDiffRow {
    pub max_diff: Option<f64>,
    pub mean_diff: Option<f64>,
    pub std_diff: Option<f64>,
}

impl From<&AggregateStat> for HeightDiffRow {
    fn from(stat: &AggregateStat) -> Self {
        if stat.count == 0 {
            return Self::default();
        }
        let s = stat.finalize();
        Self {
            max_diff: Some(s.max),
            mean_diff: Some(s.mean),
            std_diff: Some(s.std),
        }
    }
}

impl RawRow for AggregateStat {
    fn merge(self, other: Self) -> Self {
        AggregateStat::merge(self, other)
    }
}

impl From<AggregateStat> for AnyRawRow {
    fn from(stat: AggregateStat) -> Self {
        AnyRawRow::HeightDiff(stat)
    }
}

/// Height maps of one classification, with its occupancy as validity mask.
#[derive(Debug, Clone)]
pub struct HeightMaps {
    pub heights: HeightRaster,
    pub occupancy: OccupancyRaster,
}

/// Absolute difference of two height layers, `None` where either is missing
/// unless `missing` supplies a value for cells the candidate lacks.
pub fn height_difference(c1: &[Option<f64>], reference: &[Option<f64>], missing: Option<f64>) -> Vec<Option<f64>> {
    c1.iter()
        .zip(reference)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some((a - b).abs()),
            (None, Some(_)) => missing,
            _ => None,
        })
        .collect()
}

impl Metric for Malt0Config {
    const NAME: &'static str = "malt0";

    type Intrinsic = HeightMaps;
    type Raw = AggregateStat;

    fn weights(&self) -> &ClassWeights {
        &self.weights
    }

    fn pixel_size(&self) -> Option<f64> {
        Some(self.pixel_size)
    }

    fn rasterize(&self, cloud: &PointCloud, grid: Option<&RasterGrid>) -> Result<HeightMaps> {
        let grid = *require_grid(Self::NAME, grid)?;
        Ok(HeightMaps {
            heights: heights_on_grid(cloud, &self.weights, grid),
            occupancy: occupancy_on_grid(cloud, &self.weights, grid),
        })
    }

    fn tile_stats(&self, c1: &HeightMaps, reference: &HeightMaps) -> Result<Vec<AggregateStat>> {
        c1.heights.ensure_same_shape(&reference.heights)?;
        reference.heights.ensure_same_shape(&reference.occupancy)?;
        c1.heights
            .layers()
            .zip(reference.heights.layers())
            .zip(reference.occupancy.layers())
            .map(|(((key, a), (_, b)), (_, mask))| {
                let diff = height_difference(a, b, self.missing_height_diff);
                let stat = stat_of_raster(&diff, mask)?;
                debug!(
                    "malt0 class {key:?}: {} pixels, mean diff {:.3}",
                    stat.count, stat.mean
                );
                Ok(stat)
            })
            .collect()
    }

    fn note(&self, raw: &AggregateStat) -> Option<f64> {
        self.notes.blend(&HeightDiffRow::from(raw))
    }
}
