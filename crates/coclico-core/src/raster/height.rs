//! Per-class height maps (one digital surface model per class key).
//!
//! The surface value of a pixel is interpolated at its centre from the class
//! points lying in the surrounding 3×3 pixel neighbourhood, weighted by
//! inverse squared distance. Only pixels that contain at least one point of
//! the class carry a height; every other pixel is `None`.
use log::debug;

use super::occupancy::tile_grid;
use super::HeightRaster;
use crate::classes::ClassWeights;
use crate::error::Result;
use crate::geometry::RasterGrid;
use crate::points::PointCloud;

/// Below this squared distance a point is considered to sit on the pixel
/// centre and its height is taken as is.
const COINCIDENT_DIST2: f64 = 1e-18;

/// Height layers for every class of `weights`, on a grid derived from the
/// cloud extent.
pub fn rasterize_heights(cloud: &PointCloud, weights: &ClassWeights, pixel_size: f64) -> Result<HeightRaster> {
    let grid = tile_grid(cloud, pixel_size)?;
    Ok(heights_on_grid(cloud, weights, grid))
}

/// Height layers on a caller-provided grid.
pub fn heights_on_grid(cloud: &PointCloud, weights: &ClassWeights, grid: RasterGrid) -> HeightRaster {
    let mut raster = HeightRaster::filled(grid, weights.class_keys(), None);

    for (layer, (key, codes)) in weights.layers().enumerate() {
        let buckets = PixelBuckets::new(cloud, &cloud.select(codes), &grid);
        let cells = raster.layer_mut(layer);
        let mut filled = 0usize;
        for row in 0..grid.height {
            for col in 0..grid.width {
                if buckets.cell(row, col).is_empty() {
                    continue;
                }
                cells[row * grid.width + col] = buckets.interpolate(cloud, &grid, row, col);
                filled += 1;
            }
        }
        debug!("height layer {key:?} ({codes:?}): {filled} pixels with data");
    }
    raster
}

/// Point indices grouped by pixel, stored as one flat index list plus
/// per-pixel offsets.
struct PixelBuckets {
    offsets: Vec<usize>,
    indices: Vec<usize>,
    width: usize,
    height: usize,
}

impl PixelBuckets {
    fn new(cloud: &PointCloud, selected: &[usize], grid: &RasterGrid) -> Self {
        let located: Vec<(usize, usize)> = selected
            .iter()
            .filter_map(|&i| {
                grid.locate(cloud.x[i], cloud.y[i])
                    .map(|(row, col)| (row * grid.width + col, i))
            })
            .collect();

        let mut offsets = vec![0usize; grid.len() + 1];
        for &(cell, _) in &located {
            offsets[cell + 1] += 1;
        }
        for k in 1..offsets.len() {
            offsets[k] += offsets[k - 1];
        }

        let mut cursor = offsets.clone();
        let mut indices = vec![0usize; located.len()];
        for &(cell, i) in &located {
            indices[cursor[cell]] = i;
            cursor[cell] += 1;
        }

        Self {
            offsets,
            indices,
            width: grid.width,
            height: grid.height,
        }
    }

    fn cell(&self, row: usize, col: usize) -> &[usize] {
        let k = row * self.width + col;
        &self.indices[self.offsets[k]..self.offsets[k + 1]]
    }

    /// Inverse-distance weighted height at the centre of `(row, col)`.
    fn interpolate(&self, cloud: &PointCloud, grid: &RasterGrid, row: usize, col: usize) -> Option<f64> {
        let (cx, cy) = grid.pixel_center(row, col);
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;

        for r in row.saturating_sub(1)..=(row + 1).min(self.height - 1) {
            for c in col.saturating_sub(1)..=(col + 1).min(self.width - 1) {
                for &i in self.cell(r, c) {
                    let dx = cloud.x[i] - cx;
                    let dy = cloud.y[i] - cy;
                    let d2 = dx * dx + dy * dy;
                    if d2 < COINCIDENT_DIST2 {
                        return Some(cloud.z[i]);
                    }
                    weight_sum += 1.0 / d2;
                    value_sum += cloud.z[i] / d2;
                }
            }
        }

        (weight_sum > 0.0).then(|| value_sum / weight_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn weights() -> ClassWeights {
        ClassWeights::new([("2", 1.0), ("6", 1.0), ("9", 1.0)]).unwrap()
    }

    #[test]
    fn point_on_pixel_centre_gives_its_height() {
        let cloud = PointCloud::from_records(&[(0.0, 0.0, 12.5, 2), (2.0, 2.0, 3.0, 2)]);
        let raster = rasterize_heights(&cloud, &weights(), 1.0).unwrap();
        let (row, col) = raster.grid.locate(0.0, 0.0).unwrap();
        assert_eq!(*raster.get(0, row, col), Some(12.5));
    }

    #[test]
    fn planar_surface_is_reproduced_between_symmetric_points() {
        // Two points symmetric around the centre of pixel (1, 1): IDW gives
        // their mean, which is also the plane value at the centre.
        let cloud = PointCloud::from_records(&[
            (0.8, 1.0, 8.0, 6),
            (1.2, 1.0, 12.0, 6),
            (0.0, 0.0, 0.0, 2),
            (2.0, 2.0, 0.0, 2),
        ]);
        let raster = rasterize_heights(&cloud, &weights(), 1.0).unwrap();
        let (row, col) = raster.grid.locate(1.0, 1.0).unwrap();
        let z = raster.get(1, row, col).unwrap();
        assert_relative_eq!(z, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn pixels_without_class_points_have_no_data() {
        let cloud = PointCloud::from_records(&[(0.0, 0.0, 1.0, 6), (3.0, 3.0, 1.0, 2)]);
        let raster = rasterize_heights(&cloud, &weights(), 1.0).unwrap();
        let layer = raster.layer_by_key("6").unwrap();
        assert_eq!(layer.iter().filter(|v| v.is_some()).count(), 1);
        assert!(raster.layer_by_key("9").unwrap().iter().all(Option::is_none));
    }

    #[test]
    fn neighbour_points_contribute_to_height() {
        // The pixel centred on (0, 0) holds one point 0.4 m from its centre;
        // the point in the next pixel is 1.4 m away and pulls the value up.
        let cloud = PointCloud::from_records(&[(0.4, 0.0, 0.0, 2), (1.4, 0.0, 10.0, 2), (0.0, 1.0, 0.0, 6)]);
        let raster = rasterize_heights(&cloud, &weights(), 1.0).unwrap();
        let (row, col) = raster.grid.locate(0.4, 0.0).unwrap();
        let z = raster.get(0, row, col).unwrap();
        let (w1, w2) = (1.0 / 0.16, 1.0 / 1.96);
        assert_relative_eq!(z, 10.0 * w2 / (w1 + w2), epsilon = 1e-9);
    }
}
