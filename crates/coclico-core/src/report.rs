//! Summaries across tiles and metrics.
//!
//! Per-tile notes of every (metric, class) pair are summarised by a few
//! statistics, and each statistic is weighted by the class weights of the
//! configuration into one overall result.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classes::ClassWeights;
use crate::config::MetricsConfig;
use crate::error::{CoclicoError, Result};
use crate::pipeline::MetricReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Min,
    Max,
    Median,
    /// Sample standard deviation (one degree of freedom removed).
    Std,
}

impl Statistic {
    pub const ALL: [Statistic; 5] = [Self::Mean, Self::Min, Self::Max, Self::Median, Self::Std];

    pub fn name(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Std => "std",
        }
    }

    /// Statistic of `values`, `None` when it is undefined for so few values.
    pub fn compute(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        match self {
            Self::Mean => Some(mean),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                Some(if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                })
            }
            Self::Std => {
                if values.len() < 2 {
                    return None;
                }
                let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
                Some((ss / (n - 1.0)).sqrt())
            }
        }
    }
}

/// One statistic of the per-tile notes of a (metric, class) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRow {
    pub statistic: Statistic,
    pub metric: String,
    pub class: String,
    pub result: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedResult {
    pub statistic: Statistic,
    pub result: Option<f64>,
}

/// Statistics of the per-tile notes of every class of every report.
///
/// Undefined notes are left out. Every class listed in a report gets rows,
/// with `None` results when none of its tiles has a note.
pub fn note_statistics(reports: &[MetricReport]) -> Vec<StatisticRow> {
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for report in reports {
        for row in &report.totals {
            groups.entry((report.metric.clone(), row.class.clone())).or_default();
        }
        for row in &report.tile_notes {
            let values = groups.entry((row.metric.clone(), row.class.clone())).or_default();
            values.extend(row.note);
        }
    }

    Statistic::ALL
        .into_iter()
        .flat_map(|statistic| {
            groups.iter().map(move |((metric, class), values)| StatisticRow {
                statistic,
                metric: metric.clone(),
                class: class.clone(),
                result: statistic.compute(values),
            })
        })
        .collect()
}

/// `Σ_metric Σ_class weight × statistic`, one value per statistic.
///
/// A weighted pair without a statistic row is an error; a row whose result
/// is undefined makes the weighted result of that statistic undefined.
pub fn weighted_result(
    statistics: &[StatisticRow],
    weights: &BTreeMap<String, ClassWeights>,
) -> Result<Vec<WeightedResult>> {
    Statistic::ALL
        .into_iter()
        .map(|statistic| {
            let mut total = Some(0.0);
            for (metric, class_weights) in weights {
                for (class, weight) in class_weights.iter() {
                    let row = statistics
                        .iter()
                        .find(|r| r.statistic == statistic && &r.metric == metric && r.class == class)
                        .ok_or_else(|| CoclicoError::MissingResult {
                            statistic: statistic.name().to_string(),
                            metric: metric.clone(),
                            class: class.to_string(),
                        })?;
                    total = total.zip(row.result).map(|(t, v)| t + weight * v);
                }
            }
            Ok(WeightedResult {
                statistic,
                result: total,
            })
        })
        .collect()
}

/// Reports of every metric that ran, with their cross-tile summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub metrics: Vec<MetricReport>,
    pub statistics: Vec<StatisticRow>,
    pub weighted: Vec<WeightedResult>,
}

impl QualityReport {
    /// Summarise `metrics`, weighting each by the class weights `config`
    /// gives it.
    pub fn build(config: &MetricsConfig, metrics: Vec<MetricReport>) -> Result<Self> {
        let weights: BTreeMap<String, ClassWeights> = config
            .metric_weights()
            .into_iter()
            .filter(|(name, _)| metrics.iter().any(|m| &m.metric == name))
            .collect();
        let statistics = note_statistics(&metrics);
        let weighted = weighted_result(&statistics, &weights)?;
        Ok(Self {
            metrics,
            statistics,
            weighted,
        })
    }
}

/// Results of one statistic row for every classification, keyed by
/// classification name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedStatisticRow {
    pub statistic: Statistic,
    pub metric: String,
    pub class: String,
    pub results: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedWeightedResult {
    pub statistic: Statistic,
    pub results: BTreeMap<String, Option<f64>>,
}

/// Quality report of one candidate classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classification: String,
    pub report: QualityReport,
}

/// Several candidate classifications scored against the same reference,
/// with their statistics and weighted results side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub classifications: Vec<ClassificationReport>,
    pub statistics: Vec<MergedStatisticRow>,
    pub weighted: Vec<MergedWeightedResult>,
}

impl ComparisonReport {
    /// Put the reports side by side. Rows are those of the first
    /// classification; a row another classification lacks is `None` for it.
    pub fn merge(classifications: Vec<ClassificationReport>) -> Result<Self> {
        for (i, c) in classifications.iter().enumerate() {
            if classifications[..i].iter().any(|o| o.classification == c.classification) {
                return Err(CoclicoError::DuplicateClassification(c.classification.clone()));
            }
        }

        let (statistics, weighted) = match classifications.first() {
            None => (Vec::new(), Vec::new()),
            Some(first) => (
                merge_statistics(&first.report.statistics, &classifications),
                merge_weighted(&first.report.weighted, &classifications),
            ),
        };
        Ok(Self {
            classifications,
            statistics,
            weighted,
        })
    }
}

fn merge_statistics(rows: &[StatisticRow], all: &[ClassificationReport]) -> Vec<MergedStatisticRow> {
    rows.iter()
        .map(|row| MergedStatisticRow {
            statistic: row.statistic,
            metric: row.metric.clone(),
            class: row.class.clone(),
            results: all
                .iter()
                .map(|c| {
                    let result = c
                        .report
                        .statistics
                        .iter()
                        .find(|r| r.statistic == row.statistic && r.metric == row.metric && r.class == row.class)
                        .and_then(|r| r.result);
                    (c.classification.clone(), result)
                })
                .collect(),
        })
        .collect()
}

fn merge_weighted(rows: &[WeightedResult], all: &[ClassificationReport]) -> Vec<MergedWeightedResult> {
    rows.iter()
        .map(|row| MergedWeightedResult {
            statistic: row.statistic,
            results: all
                .iter()
                .map(|c| {
                    let result = c
                        .report
                        .weighted
                        .iter()
                        .find(|r| r.statistic == row.statistic)
                        .and_then(|r| r.result);
                    (c.classification.clone(), result)
                })
                .collect(),
        })
        .collect()
}
