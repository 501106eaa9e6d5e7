//! Metric configuration: which metrics to run, with which class weights and
//! which note functions.
//!
//! ```yaml
//! mpla0:
//!   weights: { "1": 1, "2": 0, "3_4_5": 1 }
//!   pixel_size: 0.5
//!   notes:
//!     ref_pixel_count_threshold: 1000
//!     above_threshold: { min_point: { metric: 0.9, note: 0 }, max_point: { metric: 1, note: 1 } }
//!     under_threshold: { min_point: { metric: 20, note: 1 }, max_point: { metric: 100, note: 0 } }
//! ```
//!
//! Every section is optional. The whole file is validated on load, before any
//! tile is read, and errors name the offending metric.
use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::classes::ClassWeights;
use crate::error::{CoclicoError, Result};
use crate::metrics::{Malt0Config, Metric, MetricKind, Mobj0Config, Mpap0Config, Mpla0Config};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpap0: Option<Mpap0Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpla0: Option<Mpla0Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malt0: Option<Malt0Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobj0: Option<Mobj0Config>,
}

impl MetricsConfig {
    /// Read a configuration file. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        debug!("loading metric configuration from {}", path.display());
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // Sections go through JSON values: unquoted numeric class keys then
        // come out as strings, as they do in JSON files.
        let sections: BTreeMap<String, serde_json::Value> = serde_yml::from_str(text)?;
        Self::from_sections(sections)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let sections: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)?;
        Self::from_sections(sections)
    }

    fn from_sections(sections: BTreeMap<String, serde_json::Value>) -> Result<Self> {
        let mut config = Self::default();
        for (name, section) in sections {
            let kind = MetricKind::from_name(&name)?;
            let invalid = |e: serde_json::Error| CoclicoError::config(&name, e.to_string());
            match kind {
                MetricKind::Mpap0 => config.mpap0 = Some(serde_json::from_value(section).map_err(invalid)?),
                MetricKind::Mpla0 => config.mpla0 = Some(serde_json::from_value(section).map_err(invalid)?),
                MetricKind::Malt0 => config.malt0 = Some(serde_json::from_value(section).map_err(invalid)?),
                MetricKind::Mobj0 => config.mobj0 = Some(serde_json::from_value(section).map_err(invalid)?),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check every configured metric. Fails on the first problem found.
    pub fn validate(&self) -> Result<()> {
        if let Some(c) = &self.mpap0 {
            check_weights(Mpap0Config::NAME, &c.weights)?;
        }
        if let Some(c) = &self.mpla0 {
            check_weights(Mpla0Config::NAME, &c.weights)?;
            check_pixel_size(Mpla0Config::NAME, c.pixel_size)?;
        }
        if let Some(c) = &self.malt0 {
            check_weights(Malt0Config::NAME, &c.weights)?;
            check_pixel_size(Malt0Config::NAME, c.pixel_size)?;
            let notes = &c.notes;
            for (field, sub) in [
                ("max_diff", &notes.max_diff),
                ("mean_diff", &notes.mean_diff),
                ("std_diff", &notes.std_diff),
            ] {
                if !sub.coefficient.is_finite() || sub.coefficient < 0.0 {
                    return Err(CoclicoError::config(
                        Malt0Config::NAME,
                        format!("notes.{field}.coefficient must be non-negative, got {}", sub.coefficient),
                    ));
                }
            }
            if notes.coefficient_sum() <= 0.0 {
                return Err(CoclicoError::config(Malt0Config::NAME, "note coefficients sum to zero"));
            }
            if let Some(d) = c.missing_height_diff {
                if !d.is_finite() || d < 0.0 {
                    return Err(CoclicoError::config(
                        Malt0Config::NAME,
                        format!("missing_height_diff must be non-negative, got {d}"),
                    ));
                }
            }
        }
        if let Some(c) = &self.mobj0 {
            check_weights(Mobj0Config::NAME, &c.weights)?;
            check_pixel_size(Mobj0Config::NAME, c.pixel_size)?;
        }
        Ok(())
    }

    /// Configured metrics, in evaluation order.
    pub fn kinds(&self) -> Vec<MetricKind> {
        MetricKind::ALL.into_iter().filter(|k| self.weights(*k).is_some()).collect()
    }

    pub fn weights(&self, kind: MetricKind) -> Option<&ClassWeights> {
        match kind {
            MetricKind::Mpap0 => self.mpap0.as_ref().map(|c| c.weights()),
            MetricKind::Mpla0 => self.mpla0.as_ref().map(|c| c.weights()),
            MetricKind::Malt0 => self.malt0.as_ref().map(|c| c.weights()),
            MetricKind::Mobj0 => self.mobj0.as_ref().map(|c| c.weights()),
        }
    }

    /// Class weights of every configured metric, keyed by metric name.
    pub fn metric_weights(&self) -> BTreeMap<String, ClassWeights> {
        self.kinds()
            .into_iter()
            .filter_map(|k| self.weights(k).map(|w| (k.name().to_string(), w.clone())))
            .collect()
    }
}

fn check_weights(metric: &str, weights: &ClassWeights) -> Result<()> {
    if weights.is_empty() {
        return Err(CoclicoError::config(metric, "no class weights"));
    }
    Ok(())
}

fn check_pixel_size(metric: &str, pixel_size: f64) -> Result<()> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(CoclicoError::config(
            metric,
            format!("pixel_size must be positive, got {pixel_size}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
mpap0:
  weights: { "1": 1, "2": 0, "3 _ 4_5": 1 }
  notes:
    ref_count_threshold: 1000
    above_threshold: { min_point: { metric: 0, note: 1 }, max_point: { metric: 0.1, note: 0 } }
    under_threshold: { min_point: { metric: 20, note: 1 }, max_point: { metric: 100, note: 0 } }
malt0:
  weights: { "2": 1, "6": 1 }
  notes:
    max_diff: { coefficient: 1, min_point: { metric: 0.1, note: 1 }, max_point: { metric: 4, note: 0 } }
    mean_diff: { coefficient: 2, min_point: { metric: 0.01, note: 1 }, max_point: { metric: 0.5, note: 0 } }
    std_diff: { coefficient: 2, min_point: { metric: 0.01, note: 1 }, max_point: { metric: 0.5, note: 0 } }
"#;

    #[test]
    fn loads_yaml_sections() {
        let config = MetricsConfig::from_yaml_str(CONFIG).unwrap();
        let mpap0 = config.mpap0.as_ref().unwrap();
        assert_eq!(mpap0.weights.class_keys(), vec!["1", "2", "3_4_5"]);
        assert_eq!(mpap0.notes.ref_count_threshold, 1000);
        let malt0 = config.malt0.as_ref().unwrap();
        assert_eq!(malt0.pixel_size, 0.5);
        assert_eq!(malt0.notes.coefficient_sum(), 5.0);
        assert!(config.mpla0.is_none());
        assert_eq!(config.kinds(), vec![MetricKind::Mpap0, MetricKind::Malt0]);
    }

    #[test]
    fn unquoted_class_keys_are_strings() {
        let config = MetricsConfig::from_yaml_str(&CONFIG.replace("\"2\": 1, \"6\": 1", "2: 1, 6: 1")).unwrap();
        assert_eq!(config.malt0.unwrap().weights.class_keys(), vec!["2", "6"]);
    }

    #[test]
    fn json_and_yaml_agree() {
        let yaml = MetricsConfig::from_yaml_str(CONFIG).unwrap();
        let json = serde_json::to_string(&yaml).unwrap();
        assert_eq!(MetricsConfig::from_json_str(&json).unwrap(), yaml);
    }

    #[test]
    fn degenerate_control_points_name_the_metric() {
        let bad = CONFIG.replace("max_point: { metric: 0.1, note: 0 }", "max_point: { metric: 0, note: 0 }");
        match MetricsConfig::from_yaml_str(&bad) {
            Err(CoclicoError::InvalidConfig { metric, reason }) => {
                assert_eq!(metric, "mpap0");
                assert!(reason.contains("invalid control points"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let text = format!("{CONFIG}mxyz0:\n  weights: {{}}\n");
        assert!(matches!(
            MetricsConfig::from_yaml_str(&text),
            Err(CoclicoError::UnknownMetric(name)) if name == "mxyz0"
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero_coefficients = CONFIG
            .replace("coefficient: 1", "coefficient: 0")
            .replace("coefficient: 2", "coefficient: 0");
        assert!(matches!(
            MetricsConfig::from_yaml_str(&zero_coefficients),
            Err(CoclicoError::InvalidConfig { metric, .. }) if metric == "malt0"
        ));

        let negative_weight = CONFIG.replace("\"2\": 0", "\"2\": -1");
        assert!(matches!(
            MetricsConfig::from_yaml_str(&negative_weight),
            Err(CoclicoError::InvalidConfig { metric, .. }) if metric == "mpap0"
        ));

        let bad_pixel = CONFIG.replace("  weights: { \"2\": 1, \"6\": 1 }", "  weights: { \"2\": 1, \"6\": 1 }\n  pixel_size: 0");
        assert!(MetricsConfig::from_yaml_str(&bad_pixel).is_err());

        let unknown_field = CONFIG.replace("ref_count_threshold", "ref_threshold");
        assert!(MetricsConfig::from_yaml_str(&unknown_field).is_err());
    }

    #[test]
    fn class_keys_may_use_another_separator() {
        let text = CONFIG.replace(
            "weights: { \"1\": 1, \"2\": 0, \"3 _ 4_5\": 1 }",
            "weights: { separator: \",\", classes: { \"1\": 1, \"2\": 0, \"3, 4,5\": 1 } }",
        );
        let config = MetricsConfig::from_yaml_str(&text).unwrap();
        let weights = &config.mpap0.as_ref().unwrap().weights;
        assert_eq!(weights.class_keys(), vec!["1", "2", "3,4,5"]);
        assert_eq!(weights.codes("3,4,5"), Some(&[3u8, 4, 5][..]));
        assert_eq!(config.metric_weights()["mpap0"].separator(), ",");
    }
}
