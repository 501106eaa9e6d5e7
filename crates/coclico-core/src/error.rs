//! Error taxonomy shared by every stage of the metric engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoclicoError>;

#[derive(Debug, Error)]
pub enum CoclicoError {
    /// Degenerate bounding box or pixel size.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A class key token that is not an integer classification code.
    #[error("malformed class key {key:?}: token {token:?} is not a classification code")]
    MalformedClassKey { key: String, token: String },

    /// Affine scoring interval with `x_max <= x_min` or non-finite coordinates.
    #[error("invalid control points: ({x_min}, {y_min}) -> ({x_max}, {y_max})")]
    InvalidControlPoints {
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    },

    #[error("invalid point cloud: {0}")]
    InvalidPointCloud(String),

    /// Two rasters (or a raster and a mask) that cannot be compared cell by cell.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid configuration for metric {metric}: {reason}")]
    InvalidConfig { metric: String, reason: String },

    #[error("unknown metric {0:?}")]
    UnknownMetric(String),

    /// A weighted (metric, class) pair without a result to weigh.
    #[error("no {statistic} result for class {class:?} of metric {metric}")]
    MissingResult {
        statistic: String,
        metric: String,
        class: String,
    },

    #[error("classification {0:?} is listed twice")]
    DuplicateClassification(String),

    #[error("cannot parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot parse YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoclicoError {
    pub(crate) fn config(metric: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            metric: metric.to_string(),
            reason: reason.into(),
        }
    }
}
