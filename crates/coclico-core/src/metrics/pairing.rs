//! Matching reference objects against candidate objects.
//!
//! Objects are compared through the global lattice coordinates of their
//! pixels, so the two object rasters only need a common pixel size, not a
//! common extent.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{AnyRawRow, RawRow};
use crate::error::{CoclicoError, Result};
use crate::raster::objects::objects_of_layer;
use crate::raster::{ObjectRaster, RasterObject};

/// Pairing counts for one class. `paired + not_paired == ref_object_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingResult {
    pub ref_object_count: u64,
    pub paired_count: u64,
    pub not_paired_count: u64,
}

impl RawRow for PairingResult {
    fn merge(self, other: Self) -> Self {
        Self {
            ref_object_count: self.ref_object_count + other.ref_object_count,
            paired_count: self.paired_count + other.paired_count,
            not_paired_count: self.not_paired_count + other.not_paired_count,
        }
    }
}

impl From<PairingResult> for AnyRawRow {
    fn from(row: PairingResult) -> Self {
        AnyRawRow::Pairing(row)
    }
}

/// A reference object is paired when it shares at least one lattice cell
/// with any candidate object.
pub fn pair_object_sets(candidate: &[RasterObject], reference: &[RasterObject]) -> PairingResult {
    let covered: HashSet<(i64, i64)> = candidate.iter().flat_map(|o| o.cells.iter().copied()).collect();
    let paired = reference
        .iter()
        .filter(|o| o.cells.iter().any(|c| covered.contains(c)))
        .count() as u64;
    let total = reference.len() as u64;
    PairingResult {
        ref_object_count: total,
        paired_count: paired,
        not_paired_count: total - paired,
    }
}

/// Pair the objects of every class layer.
pub fn pair_objects(candidate: &ObjectRaster, reference: &ObjectRaster) -> Result<Vec<PairingResult>> {
    if candidate.grid.pixel_size != reference.grid.pixel_size {
        return Err(CoclicoError::ShapeMismatch(format!(
            "pixel sizes differ: {} vs {}",
            candidate.grid.pixel_size, reference.grid.pixel_size
        )));
    }
    if candidate.class_keys != reference.class_keys {
        return Err(CoclicoError::ShapeMismatch(format!(
            "class layers differ: {:?} vs {:?}",
            candidate.class_keys, reference.class_keys
        )));
    }
    Ok((0..reference.layer_count())
        .map(|layer| pair_object_sets(&objects_of_layer(candidate, layer), &objects_of_layer(reference, layer)))
        .collect())
}
