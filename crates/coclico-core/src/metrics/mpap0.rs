//! MPAP0: number of points per class.
//!
//! Compares how many points each classification puts in every class. Above
//! the reference-count threshold the difference is scored relative to the
//! reference count, under it as an absolute number of points.
use log::debug;
use serde::{Deserialize, Serialize};

use super::{two_regime_note, AnyRawRow, BoundedAffine, Metric, RawRow};
use crate::classes::ClassWeights;
use crate::error::Result;
use crate::geometry::RasterGrid;
use crate::points::PointCloud;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mpap0Config {
    pub weights: ClassWeights,
    pub notes: Mpap0Notes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mpap0Notes {
    pub ref_count_threshold: u64,
    pub above_threshold: BoundedAffine,
    pub under_threshold: BoundedAffine,
}

/// Point counts of one class. Tiles merge by summing counts; the difference
/// is taken afterwards, so the merged row scores `|Σ c1 - Σ ref|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointCountRow {
    pub c1_count: u64,
    pub ref_count: u64,
}

impl PointCountRow {
    pub fn absolute_diff(&self) -> u64 {
        self.c1_count.abs_diff(self.ref_count)
    }
}

impl RawRow for PointCountRow {
    fn merge(self, other: Self) -> Self {
        Self {
            c1_count: self.c1_count + other.c1_count,
            ref_count: self.ref_count + other.ref_count,
        }
    }
}

impl From<PointCountRow> for AnyRawRow {
    fn from(row: PointCountRow) -> Self {
        AnyRawRow::PointCount(row)
    }
}

/// Points of each class key, composed keys summing their elementary codes.
pub fn count_points(cloud: &PointCloud, weights: &ClassWeights) -> Vec<u64> {
    weights
        .layers()
        .map(|(key, codes)| {
            let n = cloud.count_classes(codes);
            debug!("mpap0 class {key:?}: {n} points");
            n
        })
        .collect()
}

impl Metric for Mpap0Config {
    const NAME: &'static str = "mpap0";

    type Intrinsic = Vec<u64>;
    type Raw = PointCountRow;

    fn weights(&self) -> &ClassWeights {
        &self.weights
    }

    fn pixel_size(&self) -> Option<f64> {
        None
    }

    fn rasterize(&self, cloud: &PointCloud, _grid: Option<&RasterGrid>) -> Result<Vec<u64>> {
        Ok(count_points(cloud, &self.weights))
    }

    fn tile_stats(&self, c1: &Vec<u64>, reference: &Vec<u64>) -> Result<Vec<PointCountRow>> {
        Ok(c1
            .iter()
            .zip(reference)
            .map(|(&c1_count, &ref_count)| PointCountRow { c1_count, ref_count })
            .collect())
    }

    fn note(&self, raw: &PointCountRow) -> Option<f64> {
        let diff = raw.absolute_diff() as f64;
        two_regime_note(
            raw.ref_count,
            self.notes.ref_count_threshold,
            &self.notes.above_threshold,
            &self.notes.under_threshold,
            // no reference point: relative difference taken as 0
            || Some(if raw.ref_count > 0 { diff / raw.ref_count as f64 } else { 0.0 }),
            diff,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ScoreControlPoint;
    use approx::assert_relative_eq;

    fn config() -> Mpap0Config {
        Mpap0Config {
            weights: ClassWeights::new([("1", 1.0), ("2", 0.0), ("3_4_5", 2.0)]).unwrap(),
            notes: Mpap0Notes {
                ref_count_threshold: 1000,
                above_threshold: BoundedAffine::new(ScoreControlPoint::new(0.0, 1.0), ScoreControlPoint::new(0.1, 0.0))
                    .unwrap(),
                under_threshold: BoundedAffine::new(
                    ScoreControlPoint::new(20.0, 1.0),
                    ScoreControlPoint::new(100.0, 0.0),
                )
                .unwrap(),
            },
        }
    }

    #[test]
    fn composed_keys_sum_their_codes() {
        let cloud = PointCloud::from_records(&[
            (0.0, 0.0, 0.0, 1),
            (0.0, 0.0, 0.0, 3),
            (0.0, 0.0, 0.0, 4),
            (0.0, 0.0, 0.0, 5),
            (0.0, 0.0, 0.0, 5),
            (0.0, 0.0, 0.0, 9),
        ]);
        assert_eq!(count_points(&cloud, &config().weights), vec![1, 0, 4]);
    }

    #[test]
    fn tile_rows_pair_counts_by_class() {
        let cfg = config();
        let c1 = PointCloud::from_records(&[(0.0, 0.0, 0.0, 1), (0.0, 0.0, 0.0, 2), (0.0, 0.0, 0.0, 2)]);
        let reference = PointCloud::from_records(&[(0.0, 0.0, 0.0, 2), (0.0, 0.0, 0.0, 3)]);
        let rows = cfg.compare_tile(&c1, &reference).unwrap();
        assert_eq!(
            rows,
            vec![
                PointCountRow { c1_count: 1, ref_count: 0 },
                PointCountRow { c1_count: 2, ref_count: 1 },
                PointCountRow { c1_count: 0, ref_count: 1 },
            ]
        );
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let cfg = config();
        let above = cfg.note(&PointCountRow { c1_count: 1050, ref_count: 1000 }).unwrap();
        assert_relative_eq!(above, 0.5, epsilon = 1e-9);
        let under = cfg.note(&PointCountRow { c1_count: 1049, ref_count: 999 }).unwrap();
        assert_relative_eq!(under, 0.625, epsilon = 1e-9);
    }

    #[test]
    fn merged_rows_diff_the_sums() {
        let a = PointCountRow { c1_count: 12, ref_count: 10 };
        let b = PointCountRow { c1_count: 8, ref_count: 10 };
        let merged = Mpap0Config::merge(a, b);
        assert_eq!(merged, PointCountRow { c1_count: 20, ref_count: 20 });
        assert_eq!(merged.absolute_diff(), 0);
        assert_eq!(a.absolute_diff() + b.absolute_diff(), 4);
        assert_eq!(PointCountRow::default().merge(a), a);
    }

    #[test]
    fn no_reference_points_scores_absolute_count() {
        let cfg = config();
        assert_eq!(cfg.note(&PointCountRow { c1_count: 5, ref_count: 0 }), Some(1.0));
        assert_eq!(cfg.note(&PointCountRow { c1_count: 500, ref_count: 0 }), Some(0.0));
    }

    #[test]
    fn zero_threshold_scores_empty_reference_as_no_difference() {
        let mut cfg = config();
        cfg.notes.ref_count_threshold = 0;
        assert_eq!(cfg.note(&PointCountRow { c1_count: 7, ref_count: 0 }), Some(1.0));
        let note = cfg.note(&PointCountRow { c1_count: 105, ref_count: 100 }).unwrap();
        assert_relative_eq!(note, 0.5, epsilon = 1e-9);
    }
}
