//! Discrete objects extracted from occupancy maps.
//!
//! Each occupancy layer is cleaned with a morphological closing followed by
//! an opening (3×3 cross structuring element), then split into 8-connected
//! components. Component ids start at 1 in row-major discovery order; 0 is
//! background.
use std::collections::BTreeMap;

use log::debug;

use super::{ObjectRaster, OccupancyRaster};
use crate::geometry::RasterGrid;

/// 3×3 cross: the pixel and its 4-neighbours.
const CROSS: [(isize, isize); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

const NEIGHBOURS_8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One connected component, as the lattice coordinates of its pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterObject {
    pub id: u32,
    pub cells: Vec<(i64, i64)>,
}

impl RasterObject {
    pub fn pixel_count(&self) -> usize {
        self.cells.len()
    }
}

/// Clean and label every layer of `occupancy`.
pub fn label_objects(occupancy: &OccupancyRaster) -> ObjectRaster {
    let grid = occupancy.grid;
    let mut objects = ObjectRaster::filled(grid, occupancy.class_keys.clone(), 0);
    for (index, (key, cells)) in occupancy.layers().enumerate() {
        let cleaned = open(&close(cells, &grid), &grid);
        let (labels, count) = label_components(&cleaned, &grid);
        objects.layer_mut(index).copy_from_slice(&labels);
        debug!("object layer {key:?}: {count} objects");
    }
    objects
}

/// Objects of layer `index`, ordered by id.
pub fn objects_of_layer(raster: &ObjectRaster, index: usize) -> Vec<RasterObject> {
    let grid = raster.grid;
    let labels = raster.layer(index);
    let mut objects: BTreeMap<u32, Vec<(i64, i64)>> = BTreeMap::new();
    for row in 0..grid.height {
        for col in 0..grid.width {
            let id = labels[row * grid.width + col];
            if id > 0 {
                objects.entry(id).or_default().push(grid.lattice(row, col));
            }
        }
    }
    objects
        .into_iter()
        .map(|(id, cells)| RasterObject { id, cells })
        .collect()
}

fn neighbour(grid: &RasterGrid, row: usize, col: usize, dr: isize, dc: isize) -> Option<usize> {
    let r = row.checked_add_signed(dr)?;
    let c = col.checked_add_signed(dc)?;
    (r < grid.height && c < grid.width).then_some(r * grid.width + c)
}

/// Pixels outside the grid never set a dilated pixel.
fn dilate(cells: &[bool], grid: &RasterGrid) -> Vec<bool> {
    let mut out = vec![false; cells.len()];
    for row in 0..grid.height {
        for col in 0..grid.width {
            out[row * grid.width + col] = CROSS
                .iter()
                .filter_map(|&(dr, dc)| neighbour(grid, row, col, dr, dc))
                .any(|k| cells[k]);
        }
    }
    out
}

/// Pixels outside the grid never clear an eroded pixel.
fn erode(cells: &[bool], grid: &RasterGrid) -> Vec<bool> {
    let mut out = vec![false; cells.len()];
    for row in 0..grid.height {
        for col in 0..grid.width {
            out[row * grid.width + col] = CROSS
                .iter()
                .filter_map(|&(dr, dc)| neighbour(grid, row, col, dr, dc))
                .all(|k| cells[k]);
        }
    }
    out
}

pub fn close(cells: &[bool], grid: &RasterGrid) -> Vec<bool> {
    erode(&dilate(cells, grid), grid)
}

pub fn open(cells: &[bool], grid: &RasterGrid) -> Vec<bool> {
    dilate(&erode(cells, grid), grid)
}

/// 8-connected component labelling. Returns the labels and the number of
/// components.
pub fn label_components(cells: &[bool], grid: &RasterGrid) -> (Vec<u32>, u32) {
    let mut labels = vec![0u32; cells.len()];
    let mut next = 0u32;
    let mut stack = Vec::new();

    for start in 0..cells.len() {
        if !cells[start] || labels[start] != 0 {
            continue;
        }
        next += 1;
        labels[start] = next;
        stack.push(start);
        while let Some(k) = stack.pop() {
            let (row, col) = (k / grid.width, k % grid.width);
            for &(dr, dc) in &NEIGHBOURS_8 {
                if let Some(n) = neighbour(grid, row, col, dr, dc) {
                    if cells[n] && labels[n] == 0 {
                        labels[n] = next;
                        stack.push(n);
                    }
                }
            }
        }
    }
    (labels, next)
}
