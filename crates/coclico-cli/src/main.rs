//! Compare one or more candidate classifications with a common reference
//! classification, tile by tile, and write the metric reports as JSON.
//!
//! Tiles are `<tile>.json` files holding a point cloud
//! (`{"x": [...], "y": [...], "z": [...], "classification": [...]}`). Every
//! tile of the reference directory is looked up under the same name in each
//! candidate directory. Candidates are named `c1`, `c2`, ... in command-line
//! order.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coclico_core::{ClassificationReport, ComparisonReport, MetricKind, MetricsConfig, PointCloud, QualityReport};
use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "coclico", about = "Classification quality metrics for point cloud tiles")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score candidate classifications against a common reference.
    Compare {
        /// Directory of candidate tiles (repeatable).
        #[arg(long = "candidate", value_name = "DIR", required = true)]
        candidates: Vec<PathBuf>,

        /// Directory of reference tiles. Its tiles define the tile set.
        #[arg(long = "ref")]
        reference: PathBuf,

        /// Metric configuration (YAML, or JSON with a .json extension).
        #[arg(short, long)]
        config: PathBuf,

        /// Output JSON report.
        #[arg(short, long)]
        output: PathBuf,

        /// Run only this metric (repeatable). Defaults to every configured metric.
        #[arg(short, long = "metric")]
        metrics: Vec<String>,
    },
}

// ── Tiles ─────────────────────────────────────────────────────────────────────

/// Tile names (file stems) of the `.json` files in `dir`, sorted.
fn discover_tiles(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading tile directory {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn read_tile(dir: &Path, name: &str) -> coclico_core::Result<PointCloud> {
    let text = fs::read_to_string(dir.join(format!("{name}.json")))?;
    let cloud: PointCloud = serde_json::from_str(&text)?;
    cloud.validate()?;
    Ok(cloud)
}

fn selected_metrics(config: &MetricsConfig, requested: &[String]) -> Result<Vec<MetricKind>> {
    if requested.is_empty() {
        return Ok(config.kinds());
    }
    let mut kinds = Vec::new();
    for name in requested {
        let kind = MetricKind::from_name(name)?;
        if config.weights(kind).is_none() {
            bail!("metric {name} is not configured");
        }
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn evaluate(
    config: &MetricsConfig,
    kinds: &[MetricKind],
    tiles: &[String],
    candidate: &Path,
    reference: &Path,
) -> Result<QualityReport> {
    let load = |name: &str| -> coclico_core::Result<(PointCloud, PointCloud)> {
        Ok((read_tile(candidate, name)?, read_tile(reference, name)?))
    };
    let mut reports = Vec::new();
    for &kind in kinds {
        let report = config.run(kind, tiles, load)?;
        if !report.errors.is_empty() {
            warn!("{kind}: {} of {} tiles skipped", report.errors.len(), tiles.len());
        }
        for row in &report.totals {
            info!("{kind} class {}: note {:?}", row.class, row.note);
        }
        reports.push(report);
    }
    Ok(QualityReport::build(config, reports)?)
}

fn compare(candidates: &[PathBuf], reference: &Path, config: &Path, output: &Path, metrics: &[String]) -> Result<()> {
    let config = MetricsConfig::load(config).with_context(|| format!("loading {}", config.display()))?;
    let kinds = selected_metrics(&config, metrics)?;
    if kinds.is_empty() {
        bail!("no metric to run");
    }

    let tiles = discover_tiles(reference)?;
    if tiles.is_empty() {
        bail!("no .json tiles in {}", reference.display());
    }
    info!("{} tiles, metrics {:?}", tiles.len(), kinds);

    let mut classifications = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let name = format!("c{}", i + 1);
        info!("{name}: comparing {} with {}", candidate.display(), reference.display());
        let report = evaluate(&config, &kinds, &tiles, candidate, reference)
            .with_context(|| format!("evaluating {}", candidate.display()))?;
        classifications.push(ClassificationReport {
            classification: name,
            report,
        });
    }

    let report = ComparisonReport::merge(classifications)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("report written to {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Compare {
            candidates,
            reference,
            config,
            output,
            metrics,
        } => compare(&candidates, &reference, &config, &output, &metrics),
    }
}
