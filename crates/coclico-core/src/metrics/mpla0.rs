//! MPLA0: planimetric footprint of every class.
//!
//! Both classifications are rasterized into occupancy maps on a shared grid.
//! A well-covered class is scored by the intersection-over-union of the two
//! maps; a sparse class by the number of pixels the maps disagree on.
use serde::{Deserialize, Serialize};

use super::{default_pixel_size, require_grid, two_regime_note, AnyRawRow, BoundedAffine, Metric, RawRow};
use crate::classes::ClassWeights;
use crate::error::Result;
use crate::geometry::RasterGrid;
use crate::points::PointCloud;
use crate::raster::occupancy::occupancy_on_grid;
use crate::raster::OccupancyRaster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mpla0Config {
    pub weights: ClassWeights,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: f64,
    pub notes: Mpla0Notes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mpla0Notes {
    pub ref_pixel_count_threshold: u64,
    pub above_threshold: BoundedAffine,
    pub under_threshold: BoundedAffine,
}

/// Pixel counts of one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyRow {
    /// Pixels occupied in the reference.
    pub ref_pixel_count: u64,
    /// Pixels occupied in both classifications.
    pub intersection: u64,
    /// Pixels occupied in either classification.
    pub union: u64,
}

impl RawRow for OccupancyRow {
    fn merge(self, other: Self) -> Self {
        Self {
            ref_pixel_count: self.ref_pixel_count + other.ref_pixel_count,
            intersection: self.intersection + other.intersection,
            union: self.union + other.union,
        }
    }
}

impl From<OccupancyRow> for AnyRawRow {
    fn from(row: OccupancyRow) -> Self {
        AnyRawRow::Occupancy(row)
    }
}

/// Per-layer counts of two occupancy rasters of the same shape.
pub fn compare_occupancy(c1: &OccupancyRaster, reference: &OccupancyRaster) -> Result<Vec<OccupancyRow>> {
    c1.ensure_same_shape(reference)?;
    Ok(c1
        .layers()
        .zip(reference.layers())
        .map(|((_, a), (_, b))| {
            let mut row = OccupancyRow::default();
            for (&a, &b) in a.iter().zip(b) {
                row.ref_pixel_count += b as u64;
                row.intersection += (a && b) as u64;
                row.union += (a || b) as u64;
            }
            row
        })
        .collect())
}

impl Metric for Mpla0Config {
    const NAME: &'static str = "mpla0";

    type Intrinsic = OccupancyRaster;
    type Raw = OccupancyRow;

    fn weights(&self) -> &ClassWeights {
        &self.weights
    }

    fn pixel_size(&self) -> Option<f64> {
        Some(self.pixel_size)
    }

    fn rasterize(&self, cloud: &PointCloud, grid: Option<&RasterGrid>) -> Result<OccupancyRaster> {
        let grid = require_grid(Self::NAME, grid)?;
        Ok(occupancy_on_grid(cloud, &self.weights, *grid))
    }

    fn tile_stats(&self, c1: &OccupancyRaster, reference: &OccupancyRaster) -> Result<Vec<OccupancyRow>> {
        compare_occupancy(c1, reference)
    }

    fn note(&self, raw: &OccupancyRow) -> Option<f64> {
        two_regime_note(
            raw.ref_pixel_count,
            self.notes.ref_pixel_count_threshold,
            &self.notes.above_threshold,
            &self.notes.under_threshold,
            || (raw.union > 0).then(|| raw.intersection as f64 / raw.union as f64),
            raw.union.saturating_sub(raw.intersection) as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ScoreControlPoint;
    use approx::assert_relative_eq;

    fn ramp(a: (f64, f64), b: (f64, f64)) -> BoundedAffine {
        BoundedAffine::new(ScoreControlPoint::new(a.0, a.1), ScoreControlPoint::new(b.0, b.1)).unwrap()
    }

    fn config() -> Mpla0Config {
        Mpla0Config {
            weights: ClassWeights::new([("1", 1.0), ("2", 1.0)]).unwrap(),
            pixel_size: 1.0,
            notes: Mpla0Notes {
                ref_pixel_count_threshold: 1000,
                above_threshold: ramp((0.9, 0.0), (1.0, 1.0)),
                under_threshold: ramp((20.0, 1.0), (100.0, 0.0)),
            },
        }
    }

    #[test]
    fn note_table() {
        let cfg = config();
        let refs = [1000, 1000, 1000, 1000, 500, 500, 500, 500, 500];
        let union = [100, 100, 100, 100, 100, 100, 100, 200, 200];
        let intersection = [100, 95, 90, 85, 95, 80, 40, 100, 50];
        let expected = [1.0, 0.5, 0.0, 0.0, 1.0, 1.0, 0.5, 0.0, 0.0];
        for i in 0..refs.len() {
            let row = OccupancyRow {
                ref_pixel_count: refs[i],
                intersection: intersection[i],
                union: union[i],
            };
            let note = cfg.note(&row).unwrap();
            assert_relative_eq!(note, expected[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_union_above_threshold_has_no_note() {
        let mut cfg = config();
        cfg.notes.ref_pixel_count_threshold = 0;
        assert_eq!(cfg.note(&OccupancyRow::default()), None);
    }

    #[test]
    fn counts_union_and_intersection_per_layer() {
        let cfg = config();
        let c1 = PointCloud::from_records(&[
            (0.0, 0.0, 0.0, 1),
            (1.0, 0.0, 0.0, 1),
            (2.0, 2.0, 0.0, 2),
        ]);
        let reference = PointCloud::from_records(&[
            (0.0, 0.0, 0.0, 1),
            (2.0, 0.0, 0.0, 1),
            (2.0, 2.0, 0.0, 1),
        ]);
        let rows = cfg.compare_tile(&c1, &reference).unwrap();
        assert_eq!(
            rows[0],
            OccupancyRow {
                ref_pixel_count: 3,
                intersection: 1,
                union: 4
            }
        );
        assert_eq!(
            rows[1],
            OccupancyRow {
                ref_pixel_count: 0,
                intersection: 0,
                union: 1
            }
        );
    }

    #[test]
    fn rows_merge_by_summing() {
        let a = OccupancyRow {
            ref_pixel_count: 3,
            intersection: 1,
            union: 4,
        };
        let b = OccupancyRow {
            ref_pixel_count: 2,
            intersection: 2,
            union: 2,
        };
        assert_eq!(
            Mpla0Config::merge(a, b),
            OccupancyRow {
                ref_pixel_count: 5,
                intersection: 3,
                union: 6
            }
        );
    }
}
