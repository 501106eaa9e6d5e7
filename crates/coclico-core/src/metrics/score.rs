//! Bounded affine scoring: a linear ramp between two control points, flat
//! outside of them.
//!
//! ```text
//!   y_min ─────╮
//!              ╰╮
//!               ╰─────── y_max
//!        x_min    x_max
//! ```
//!
//! Every metric turns its raw comparison value into a note with this function.
use serde::{Deserialize, Serialize};

use crate::error::{CoclicoError, Result};

/// One end of the ramp: raw `metric` value mapped to `note`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreControlPoint {
    pub metric: f64,
    pub note: f64,
}

impl ScoreControlPoint {
    pub const fn new(metric: f64, note: f64) -> Self {
        Self { metric, note }
    }
}

/// Validated scoring function. Construction guarantees `x_min < x_max`, so
/// the slope is always defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ControlPoints", into = "ControlPoints")]
pub struct BoundedAffine {
    min_point: ScoreControlPoint,
    max_point: ScoreControlPoint,
    slope: f64,
    intercept: f64,
}

/// Serialized form of [`BoundedAffine`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlPoints {
    pub min_point: ScoreControlPoint,
    pub max_point: ScoreControlPoint,
}

impl BoundedAffine {
    pub fn new(min_point: ScoreControlPoint, max_point: ScoreControlPoint) -> Result<Self> {
        let coords = [min_point.metric, min_point.note, max_point.metric, max_point.note];
        if coords.iter().any(|v| !v.is_finite()) || max_point.metric <= min_point.metric {
            return Err(CoclicoError::InvalidControlPoints {
                x_min: min_point.metric,
                y_min: min_point.note,
                x_max: max_point.metric,
                y_max: max_point.note,
            });
        }
        let slope = (max_point.note - min_point.note) / (max_point.metric - min_point.metric);
        Ok(Self {
            min_point,
            max_point,
            slope,
            intercept: min_point.note - slope * min_point.metric,
        })
    }

    pub fn min_point(&self) -> ScoreControlPoint {
        self.min_point
    }

    pub fn max_point(&self) -> ScoreControlPoint {
        self.max_point
    }

    /// Note of a single raw value. `NaN` stays `NaN`.
    #[inline]
    pub fn score(&self, x: f64) -> f64 {
        if x < self.min_point.metric {
            self.min_point.note
        } else if x > self.max_point.metric {
            self.max_point.note
        } else {
            self.slope * x + self.intercept
        }
    }

    /// Notes of a slice of raw values, same length and order.
    pub fn score_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.score(x)).collect()
    }

    /// Note of an optional raw value; `None` and `NaN` both give `None`.
    pub fn score_opt(&self, x: Option<f64>) -> Option<f64> {
        x.filter(|v| !v.is_nan()).map(|v| self.score(v))
    }
}

impl TryFrom<ControlPoints> for BoundedAffine {
    type Error = CoclicoError;

    fn try_from(points: ControlPoints) -> Result<Self> {
        Self::new(points.min_point, points.max_point)
    }
}

impl From<BoundedAffine> for ControlPoints {
    fn from(f: BoundedAffine) -> Self {
        Self {
            min_point: f.min_point,
            max_point: f.max_point,
        }
    }
}

/// One-shot form of [`BoundedAffine::score`].
pub fn score(min_point: ScoreControlPoint, max_point: ScoreControlPoint, x: f64) -> Result<f64> {
    Ok(BoundedAffine::new(min_point, max_point)?.score(x))
}
