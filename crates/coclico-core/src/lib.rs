//! Tile-wise quality metrics for point cloud classifications.
//!
//! A candidate classification is compared with a reference classification of
//! the same tiles. Each metric rasterizes both per class, compares them tile by
//! tile, merges the raw comparisons over all tiles and maps them to notes in
//! `[0, 1]` through bounded affine functions.
pub mod classes;
pub mod config;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod pipeline;
pub mod points;
pub mod raster;
pub mod report;
pub mod stats;

pub use classes::{split_class_key, ClassWeights};
pub use config::MetricsConfig;
pub use error::{CoclicoError, Result};
pub use geometry::RasterGrid;
pub use metrics::{Metric, MetricKind};
pub use pipeline::{run_metric, run_metric_loading, MetricReport, NoteRow, TileError, TilePair};
pub use points::{BoundingBox, PointCloud};
pub use report::{ClassificationReport, ComparisonReport, QualityReport, Statistic};
pub use stats::{AggregateStat, StatSummary, TileStat};
