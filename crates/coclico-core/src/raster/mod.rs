//! Per-class rasters built from a single tile.
pub mod height;
pub mod objects;
pub mod occupancy;

use serde::{Deserialize, Serialize};

use crate::error::{CoclicoError, Result};
use crate::geometry::RasterGrid;

pub use height::rasterize_heights;
pub use objects::{label_objects, RasterObject};
pub use occupancy::rasterize_occupancy;

/// Stack of 2D layers sharing one grid, one layer per class key.
///
/// Layers are row-major and ordered like `class_keys` (sorted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayeredRaster<T> {
    pub grid: RasterGrid,
    pub class_keys: Vec<String>,
    layers: Vec<Vec<T>>,
}

pub type OccupancyRaster = LayeredRaster<bool>;
pub type HeightRaster = LayeredRaster<Option<f64>>;
pub type ObjectRaster = LayeredRaster<u32>;

impl<T: Clone> LayeredRaster<T> {
    /// Raster with every cell of every layer set to `fill`.
    pub fn filled(grid: RasterGrid, class_keys: Vec<String>, fill: T) -> Self {
        let layers = vec![vec![fill; grid.len()]; class_keys.len()];
        Self { grid, class_keys, layers }
    }
}

impl<T> LayeredRaster<T> {
    /// Assemble a raster from already computed layers.
    pub fn from_layers(grid: RasterGrid, class_keys: Vec<String>, layers: Vec<Vec<T>>) -> Result<Self> {
        if layers.len() != class_keys.len() {
            return Err(CoclicoError::ShapeMismatch(format!(
                "{} layers for {} class keys",
                layers.len(),
                class_keys.len()
            )));
        }
        if let Some(bad) = layers.iter().position(|l| l.len() != grid.len()) {
            return Err(CoclicoError::ShapeMismatch(format!(
                "layer {bad} has {} cells, grid has {}",
                layers[bad].len(),
                grid.len()
            )));
        }
        Ok(Self { grid, class_keys, layers })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> &[T] {
        &self.layers[index]
    }

    pub fn layer_mut(&mut self, index: usize) -> &mut [T] {
        &mut self.layers[index]
    }

    /// Layer of `class_key`, if present.
    pub fn layer_by_key(&self, class_key: &str) -> Option<&[T]> {
        self.class_keys
            .iter()
            .position(|k| k == class_key)
            .map(|i| self.layers[i].as_slice())
    }

    pub fn layers(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.class_keys
            .iter()
            .map(String::as_str)
            .zip(self.layers.iter().map(Vec::as_slice))
    }

    #[inline]
    pub fn get(&self, layer: usize, row: usize, col: usize) -> &T {
        &self.layers[layer][row * self.grid.width + col]
    }

    #[inline]
    pub fn set(&mut self, layer: usize, row: usize, col: usize, val: T) {
        let width = self.grid.width;
        self.layers[layer][row * width + col] = val;
    }

    /// Check that `other` can be compared cell by cell with `self`.
    pub fn ensure_same_shape<U>(&self, other: &LayeredRaster<U>) -> Result<()> {
        if self.class_keys != other.class_keys {
            return Err(CoclicoError::ShapeMismatch(format!(
                "class layers differ: {:?} vs {:?}",
                self.class_keys, other.class_keys
            )));
        }
        if self.grid.width != other.grid.width || self.grid.height != other.grid.height {
            return Err(CoclicoError::ShapeMismatch(format!(
                "grid sizes differ: {}x{} vs {}x{}",
                self.grid.width, self.grid.height, other.grid.width, other.grid.height
            )));
        }
        Ok(())
    }
}
