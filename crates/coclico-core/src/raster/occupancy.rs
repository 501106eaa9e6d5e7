//! Binary occupancy maps: one boolean layer per class key, `true` where at
//! least one point of the class falls in the pixel.
use log::debug;

use super::OccupancyRaster;
use crate::classes::ClassWeights;
use crate::error::{CoclicoError, Result};
use crate::geometry::RasterGrid;
use crate::points::PointCloud;

/// Grid covering every point of `cloud` at `pixel_size`.
pub fn tile_grid(cloud: &PointCloud, pixel_size: f64) -> Result<RasterGrid> {
    let bounds = cloud
        .bounds()
        .ok_or_else(|| CoclicoError::InvalidGeometry("point cloud is empty".to_string()))?;
    RasterGrid::covering(bounds, pixel_size)
}

/// Occupancy layers for every class of `weights`, on a grid derived from the
/// cloud extent.
pub fn rasterize_occupancy(cloud: &PointCloud, weights: &ClassWeights, pixel_size: f64) -> Result<OccupancyRaster> {
    let grid = tile_grid(cloud, pixel_size)?;
    Ok(occupancy_on_grid(cloud, weights, grid))
}

/// Occupancy layers on a caller-provided grid. Points outside the grid are
/// ignored.
pub fn occupancy_on_grid(cloud: &PointCloud, weights: &ClassWeights, grid: RasterGrid) -> OccupancyRaster {
    let mut raster = OccupancyRaster::filled(grid, weights.class_keys(), false);

    for (layer, (key, codes)) in weights.layers().enumerate() {
        let mut hits = 0usize;
        for i in cloud.select(codes) {
            if let Some((row, col)) = grid.locate(cloud.x[i], cloud.y[i]) {
                raster.set(layer, row, col, true);
                hits += 1;
            }
        }
        debug!("occupancy layer {key:?} ({codes:?}): {hits} points");
    }

    debug!(
        "occupancy raster {}x{} with layers {:?}",
        grid.width, grid.height, raster.class_keys
    );
    raster
}

/// Number of `true` cells per layer, in layer order.
pub fn count_per_layer(raster: &OccupancyRaster) -> Vec<u64> {
    raster
        .layers()
        .map(|(_, cells)| cells.iter().filter(|&&c| c).count() as u64)
        .collect()
}
