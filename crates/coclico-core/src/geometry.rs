//! Raster geometry derived from a point cloud extent.
//!
//! Pixel centres sit on the global lattice `k * pixel_size`, so every grid
//! built with the same pixel size shares cell boundaries with every other one,
//! whatever the tile it came from. Cells can therefore be compared across
//! tiles and classifications through their integer lattice coordinates.
use serde::{Deserialize, Serialize};

use crate::error::{CoclicoError, Result};
use crate::points::BoundingBox;

/// Geometric descriptor of a north-up raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    /// X coordinate of the centre of the top-left pixel.
    pub origin_x: f64,
    /// Y coordinate of the centre of the top-left pixel.
    pub origin_y: f64,
    pub pixel_size: f64,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    lattice_x: i64,
    lattice_y: i64,
}

impl RasterGrid {
    /// Derive the smallest lattice-aligned grid whose pixels cover `bbox`.
    ///
    /// Bounds are snapped to the nearest multiple of `pixel_size`; ties are
    /// broken towards the inside of the box so the margin left around the
    /// extent is always strictly less than one pixel. The pixel count per
    /// axis is `ceil((max - min) / pixel_size) + 1` on the snapped bounds.
    pub fn from_bounds(bbox: BoundingBox, pixel_size: f64) -> Result<Self> {
        let values = [bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax, pixel_size];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoclicoError::InvalidGeometry(format!(
                "non-finite bounds {bbox:?} or pixel size {pixel_size}"
            )));
        }
        if pixel_size <= 0.0 {
            return Err(CoclicoError::InvalidGeometry(format!(
                "pixel size must be positive, got {pixel_size}"
            )));
        }
        if bbox.xmax <= bbox.xmin || bbox.ymax <= bbox.ymin {
            return Err(CoclicoError::InvalidGeometry(format!(
                "empty extent {bbox:?}"
            )));
        }

        let snap_min = |v: f64| (v / pixel_size + 0.5).floor() as i64;
        let snap_max = |v: f64| (v / pixel_size - 0.5).ceil() as i64;

        let ix_min = snap_min(bbox.xmin);
        let ix_max = snap_max(bbox.xmax).max(ix_min);
        let iy_min = snap_min(bbox.ymin);
        let iy_max = snap_max(bbox.ymax).max(iy_min);

        Ok(Self {
            origin_x: ix_min as f64 * pixel_size,
            origin_y: iy_max as f64 * pixel_size,
            pixel_size,
            width: (ix_max - ix_min) as usize + 1,
            height: (iy_max - iy_min) as usize + 1,
            lattice_x: ix_min,
            lattice_y: iy_max,
        })
    }

    /// Like [`RasterGrid::from_bounds`], but tolerates point clouds whose
    /// extent is zero along an axis (a single point, a line of points) by
    /// widening that axis by one pixel.
    pub fn covering(bbox: BoundingBox, pixel_size: f64) -> Result<Self> {
        let mut padded = bbox;
        if padded.xmax <= padded.xmin {
            padded.xmax = padded.xmin + pixel_size;
        }
        if padded.ymax <= padded.ymin {
            padded.ymax = padded.ymin + pixel_size;
        }
        Self::from_bounds(padded, pixel_size)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outer extent of the grid (pixel edges, not centres).
    pub fn extent(&self) -> BoundingBox {
        let half = self.pixel_size / 2.0;
        BoundingBox {
            xmin: self.origin_x - half,
            ymin: self.origin_y - self.height as f64 * self.pixel_size + half,
            xmax: self.origin_x + self.width as f64 * self.pixel_size - half,
            ymax: self.origin_y + half,
        }
    }

    /// Centre of pixel `(row, col)`.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_size,
            self.origin_y - row as f64 * self.pixel_size,
        )
    }

    /// Pixel `(row, col)` containing `(x, y)`, or `None` outside the grid.
    ///
    /// Points lying exactly on the right or bottom grid edge belong to the
    /// last column or row.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let half = self.pixel_size / 2.0;
        let fx = (x - (self.origin_x - half)) / self.pixel_size;
        let fy = ((self.origin_y + half) - y) / self.pixel_size;
        let col = Self::axis_index(fx, self.width)?;
        let row = Self::axis_index(fy, self.height)?;
        Some((row, col))
    }

    fn axis_index(f: f64, n: usize) -> Option<usize> {
        // Absorbs rounding on points sitting on the outer pixel edges.
        const EDGE_EPS: f64 = 1e-9;
        if n == 0 || !(-EDGE_EPS..=n as f64 + EDGE_EPS).contains(&f) {
            return None;
        }
        Some((f.max(0.0).floor() as usize).min(n - 1))
    }

    /// Integer lattice coordinates `(round(x / p), round(y / p))` of the
    /// centre of pixel `(row, col)`.
    #[inline]
    pub fn lattice(&self, row: usize, col: usize) -> (i64, i64) {
        (self.lattice_x + col as i64, self.lattice_y - row as i64)
    }
}
