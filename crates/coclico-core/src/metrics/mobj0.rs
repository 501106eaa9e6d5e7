//! MOBJ0: object detection per class.
//!
//! Occupancy maps of both classifications are cleaned and split into
//! connected objects; every reference object is then looked up among the
//! candidate objects. Classes with many reference objects are scored by the
//! paired ratio, the others by the number of missed objects.
use serde::{Deserialize, Serialize};

use super::pairing::{pair_objects, PairingResult};
use super::{default_pixel_size, require_grid, two_regime_note, BoundedAffine, Metric};
use crate::classes::ClassWeights;
use crate::error::Result;
use crate::geometry::RasterGrid;
use crate::points::PointCloud;
use crate::raster::objects::label_objects;
use crate::raster::occupancy::occupancy_on_grid;
use crate::raster::ObjectRaster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mobj0Config {
    pub weights: ClassWeights,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: f64,
    pub notes: Mobj0Notes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mobj0Notes {
    pub ref_object_count_threshold: u64,
    pub above_threshold: BoundedAffine,
    pub under_threshold: BoundedAffine,
}

impl Metric for Mobj0Config {
    const NAME: &'static str = "mobj0";

    type Intrinsic = ObjectRaster;
    type Raw = PairingResult;

    fn weights(&self) -> &ClassWeights {
        &self.weights
    }

    fn pixel_size(&self) -> Option<f64> {
        Some(self.pixel_size)
    }

    fn rasterize(&self, cloud: &PointCloud, grid: Option<&RasterGrid>) -> Result<ObjectRaster> {
        let grid = require_grid(Self::NAME, grid)?;
        Ok(label_objects(&occupancy_on_grid(cloud, &self.weights, *grid)))
    }

    fn tile_stats(&self, c1: &ObjectRaster, reference: &ObjectRaster) -> Result<Vec<PairingResult>> {
        pair_objects(c1, reference)
    }

    fn note(&self, raw: &PairingResult) -> Option<f64> {
        let matched = raw.paired_count + raw.not_paired_count;
        two_regime_note(
            raw.ref_object_count,
            self.notes.ref_object_count_threshold,
            &self.notes.above_threshold,
            &self.notes.under_threshold,
            || (matched > 0).then(|| raw.paired_count as f64 / matched as f64),
            raw.not_paired_count as f64,
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

    fn config() -> Mobj0Config {
        Mobj0Config {
            weights: ClassWeights::new([("1", 1.0), ("6", 1.0)]).unwrap(),
            pixel_size: 1.0,
            notes: Mobj0Notes {
                ref_object_count_threshold: 20,
                above_threshold: ramp((0.8, 0.0), (1.0, 1.0)),
                under_threshold: ramp((0.0, 1.0), (4.0, 0.0)),
            },
        }
    }

    fn row(ref_object_count: u64, paired_count: u64, not_paired_count: u64) -> PairingResult {
        PairingResult {
            ref_object_count,
            paired_count,
            not_paired_count,
        }
    }

    #[test]
    fn note_tables() {
        let cfg = config();
        let cases = [
            (row(20, 20, 0), 1.0),
            (row(10, 0, 1), 0.75),
            (row(0, 1, 2), 0.5),
            (row(10, 0, 3), 0.25),
            (row(19, 100, 4), 0.0),
            (row(90, 80, 20), 0.0),
            (row(200, 100, 150), 0.0),
            (row(100, 90, 10), 0.5),
        ];
        for (raw, expected) in cases {
            assert_relative_eq!(cfg.note(&raw).unwrap(), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn no_objects_above_threshold_has_no_note() {
        let mut cfg = config();
        cfg.notes.ref_object_count_threshold = 0;
        assert_eq!(cfg.note(&PairingResult::default()), None);
    }

    fn block(cloud: &mut PointCloud, x0: i32, y0: i32, class: u8) {
        for dx in 0..3 {
            for dy in 0..3 {
                cloud.push((x0 + dx) as f64, (y0 + dy) as f64, 0.0, class);
            }
        }
    }

    #[test]
    fn overlapping_blocks_are_paired() {
        let mut reference = PointCloud::from_records(&[(0.0, 0.0, 0.0, 1), (10.0, 10.0, 0.0, 1)]);
        block(&mut reference, 1, 1, 6);
        block(&mut reference, 7, 7, 6);
        let mut c1 = PointCloud::from_records(&[(0.0, 0.0, 0.0, 1), (10.0, 10.0, 0.0, 1)]);
        block(&mut c1, 2, 2, 6);

        let rows = config().compare_tile(&c1, &reference).unwrap();
        // Isolated class-1 pixels do not survive cleaning.
        assert_eq!(rows[0], PairingResult::default());
        assert_eq!(rows[1], row(2, 1, 1));
    }
}
