use serde::{Deserialize, Serialize};

use crate::error::{CoclicoError, Result};

/// Axis-aligned planimetric extent in map units (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Decoded tile of classified points, stored column-wise.
///
/// Columns always have the same length; the constructor enforces it and
/// deserialized values should go through [`PointCloud::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub classification: Vec<u8>,
}

impl PointCloud {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>, classification: Vec<u8>) -> Result<Self> {
        let cloud = Self { x, y, z, classification };
        cloud.validate()?;
        Ok(cloud)
    }

    /// Build a cloud from `(x, y, z, class)` records.
    pub fn from_records(records: &[(f64, f64, f64, u8)]) -> Self {
        let mut cloud = Self::default();
        for &(x, y, z, class) in records {
            cloud.push(x, y, z, class);
        }
        cloud
    }

    pub fn push(&mut self, x: f64, y: f64, z: f64, class: u8) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
        self.classification.push(class);
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.x.len();
        if self.y.len() != n || self.z.len() != n || self.classification.len() != n {
            return Err(CoclicoError::InvalidPointCloud(format!(
                "column lengths differ: x={}, y={}, z={}, classification={}",
                n,
                self.y.len(),
                self.z.len(),
                self.classification.len()
            )));
        }
        let finite = |i: usize| self.x[i].is_finite() && self.y[i].is_finite() && self.z[i].is_finite();
        if let Some(i) = (0..n).find(|&i| !finite(i)) {
            return Err(CoclicoError::InvalidPointCloud(format!(
                "point {i} has non-finite coordinates"
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Extent of all points, `None` for an empty cloud.
    pub fn bounds(&self) -> Option<BoundingBox> {
        if self.is_empty() {
            return None;
        }
        let fold = |v: &[f64]| {
            v.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)))
        };
        let (xmin, xmax) = fold(&self.x);
        let (ymin, ymax) = fold(&self.y);
        Some(BoundingBox { xmin, ymin, xmax, ymax })
    }

    /// Number of points whose classification is in `codes`.
    pub fn count_classes(&self, codes: &[u8]) -> u64 {
        self.classification.iter().filter(|c| codes.contains(c)).count() as u64
    }

    /// Indices of the points whose classification is in `codes`.
    pub fn select(&self, codes: &[u8]) -> Vec<usize> {
        self.classification
            .iter()
            .enumerate()
            .filter(|(_, c)| codes.contains(c))
            .map(|(i, _)| i)
            .collect()
    }
}
