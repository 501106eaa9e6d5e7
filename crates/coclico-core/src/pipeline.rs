//! Running one metric over a set of tiles.
//!
//! Tiles are compared independently (in parallel with the `threading`
//! feature), then their raw rows are merged class by class into totals. A tile
//! that fails to load or compare is reported and skipped; the others still
//! count.
use log::{debug, warn};
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::Serialize;

use crate::config::MetricsConfig;
use crate::error::{CoclicoError, Result};
use crate::metrics::{AnyRawRow, Metric, MetricKind, RawRow};
use crate::points::PointCloud;

/// Candidate and reference classifications of one tile.
#[derive(Debug, Clone)]
pub struct TilePair {
    pub name: String,
    pub c1: PointCloud,
    pub reference: PointCloud,
}

/// Raw comparison values of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassRawRow {
    pub class: String,
    #[serde(flatten)]
    pub raw: AnyRawRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileRows {
    pub tile: String,
    pub rows: Vec<ClassRawRow>,
}

/// Note of one class, for one tile or (`tile == None`) for all tiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile: Option<String>,
    pub class: String,
    pub metric: String,
    pub note: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileError {
    pub tile: String,
    pub message: String,
}

/// Everything one metric produced over a set of tiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub metric: String,
    /// Raw rows per successfully compared tile, in input order.
    pub tiles: Vec<TileRows>,
    /// Raw rows merged over all tiles.
    pub raw_totals: Vec<ClassRawRow>,
    /// Notes of the merged rows.
    pub totals: Vec<NoteRow>,
    pub tile_notes: Vec<NoteRow>,
    pub errors: Vec<TileError>,
}

impl MetricReport {
    pub fn total_note(&self, class: &str) -> Option<f64> {
        self.totals.iter().find(|r| r.class == class).and_then(|r| r.note)
    }
}

/// Run `metric` over in-memory tile pairs. Tiles are taken in order; names
/// are only used to label rows and errors.
pub fn run_metric<M: Metric>(metric: &M, tiles: &[TilePair]) -> MetricReport {
    let names: Vec<&str> = tiles.iter().map(|t| t.name.as_str()).collect();
    run_metric_with(metric, &names, |i| metric.compare_tile(&tiles[i].c1, &tiles[i].reference))
}

/// Run `metric` over the tiles `names`, loading each through `load` right
/// before it is compared. `load` returns `(c1, reference)`.
pub fn run_metric_loading<M, F>(metric: &M, names: &[String], load: F) -> MetricReport
where
    M: Metric,
    F: Fn(&str) -> Result<(PointCloud, PointCloud)> + Sync,
{
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    run_metric_with(metric, &names, |i| {
        let (c1, reference) = load(names[i])?;
        metric.compare_tile(&c1, &reference)
    })
}

/// `compare` receives the index of the tile in `names`.
fn run_metric_with<M, F>(metric: &M, names: &[&str], compare: F) -> MetricReport
where
    M: Metric,
    F: Fn(usize) -> Result<Vec<M::Raw>> + Sync,
{
    let classes = metric.weights().class_keys();

    let compare_one = |i: usize| {
        let result = compare(i).and_then(|rows| {
            if rows.len() == classes.len() {
                Ok(rows)
            } else {
                Err(CoclicoError::ShapeMismatch(format!(
                    "{} rows for {} classes",
                    rows.len(),
                    classes.len()
                )))
            }
        });
        (names[i].to_string(), result)
    };

    #[cfg(feature = "threading")]
    let results: Vec<(String, Result<Vec<M::Raw>>)> =
        (0..names.len()).into_par_iter().map(compare_one).collect();
    #[cfg(not(feature = "threading"))]
    let results: Vec<(String, Result<Vec<M::Raw>>)> = (0..names.len()).map(compare_one).collect();

    let mut report = MetricReport {
        metric: M::NAME.to_string(),
        tiles: Vec::new(),
        raw_totals: Vec::new(),
        totals: Vec::new(),
        tile_notes: Vec::new(),
        errors: Vec::new(),
    };
    let mut totals = vec![M::Raw::default(); classes.len()];

    for (tile, result) in results {
        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{}: tile {tile} skipped: {e}", M::NAME);
                report.errors.push(TileError {
                    tile,
                    message: e.to_string(),
                });
                continue;
            }
        };
        debug!("{}: tile {tile} compared", M::NAME);

        for (class, raw) in classes.iter().zip(&rows) {
            report.tile_notes.push(NoteRow {
                tile: Some(tile.clone()),
                class: class.clone(),
                metric: M::NAME.to_string(),
                note: metric.note(raw),
            });
        }
        report.tiles.push(TileRows {
            tile,
            rows: raw_rows(&classes, rows.iter().cloned()),
        });
        totals = totals.into_iter().zip(rows).map(|(a, b)| M::merge(a, b)).collect();
    }

    report.totals = classes
        .iter()
        .zip(&totals)
        .map(|(class, raw)| NoteRow {
            tile: None,
            class: class.clone(),
            metric: M::NAME.to_string(),
            note: metric.note(raw),
        })
        .collect();
    report.raw_totals = raw_rows(&classes, totals.into_iter());
    report
}

fn raw_rows<R: RawRow>(classes: &[String], rows: impl Iterator<Item = R>) -> Vec<ClassRawRow> {
    classes
        .iter()
        .zip(rows)
        .map(|(class, raw)| ClassRawRow {
            class: class.clone(),
            raw: raw.into(),
        })
        .collect()
}

impl MetricsConfig {
    /// Run the configured metric `kind` over the tiles `names`.
    pub fn run<F>(&self, kind: MetricKind, names: &[String], load: F) -> Result<MetricReport>
    where
        F: Fn(&str) -> Result<(PointCloud, PointCloud)> + Sync,
    {
        let not_configured = || CoclicoError::config(kind.name(), "metric is not configured");
        Ok(match kind {
            MetricKind::Mpap0 => run_metric_loading(self.mpap0.as_ref().ok_or_else(not_configured)?, names, load),
            MetricKind::Mpla0 => run_metric_loading(self.mpla0.as_ref().ok_or_else(not_configured)?, names, load),
            MetricKind::Malt0 => run_metric_loading(self.malt0.as_ref().ok_or_else(not_configured)?, names, load),
            MetricKind::Mobj0 => run_metric_loading(self.mobj0.as_ref().ok_or_else(not_configured)?, names, load),
        })
    }
}
