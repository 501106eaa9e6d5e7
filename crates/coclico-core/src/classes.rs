//! Class keys and class weights.
//!
//! A class key names one scored class. It may merge several elementary
//! classification codes, e.g. `"3_4_5"` scores vegetation classes 3, 4 and 5
//! as a single class.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoclicoError, Result};

pub const DEFAULT_SEPARATOR: &str = "_";

/// Split `key` on `separator` into elementary classification codes.
///
/// Tokens are trimmed before parsing, so `"3 _ 4"` resolves to `[3, 4]`.
pub fn split_class_key(key: &str, separator: &str) -> Result<Vec<u8>> {
    key.split(separator)
        .map(|token| {
            let token = token.trim();
            token.parse::<u8>().map_err(|_| CoclicoError::MalformedClassKey {
                key: key.to_string(),
                token: token.to_string(),
            })
        })
        .collect()
}

/// Class key → weight, iterated in sorted key order.
///
/// Sorted iteration is what gives every layered raster the same layer order,
/// so two rasters built from the same weights can be compared layer by layer.
///
/// Deserializes from a plain map (`{"1": 1, "3_4_5": 2}`, keys split on
/// `_`) or from `{separator: ",", classes: {"3,4,5": 2}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightsFields", into = "WeightsFields")]
pub struct ClassWeights {
    weights: BTreeMap<String, f64>,
    codes: BTreeMap<String, Vec<u8>>,
    separator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WeightsFields {
    Separated {
        separator: String,
        classes: BTreeMap<String, f64>,
    },
    Plain(BTreeMap<String, f64>),
}

impl ClassWeights {
    /// Build weights from raw keys split on [`DEFAULT_SEPARATOR`].
    pub fn new<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        Self::with_separator(entries, DEFAULT_SEPARATOR)
    }

    /// Build weights from raw keys whose elementary codes are joined by
    /// `separator`.
    ///
    /// Spaces are stripped from keys (`"3 _ 4"` becomes `"3_4"`), each key is
    /// resolved once, and weights must be finite and non-negative.
    pub fn with_separator<I, K>(entries: I, separator: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        if separator.trim().is_empty() {
            return Err(CoclicoError::InvalidConfig {
                metric: "weights".to_string(),
                reason: format!("invalid class separator {separator:?}"),
            });
        }
        let mut weights = BTreeMap::new();
        let mut codes = BTreeMap::new();
        for (key, weight) in entries {
            let key: String = key.as_ref().chars().filter(|c| *c != ' ').collect();
            if !weight.is_finite() || weight < 0.0 {
                return Err(CoclicoError::InvalidConfig {
                    metric: "weights".to_string(),
                    reason: format!("class {key:?} has invalid weight {weight}"),
                });
            }
            codes.insert(key.clone(), split_class_key(&key, separator)?);
            weights.insert(key, weight);
        }
        Ok(Self {
            weights,
            codes,
            separator: separator.to_string(),
        })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Sorted class keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn class_keys(&self) -> Vec<String> {
        self.weights.keys().cloned().collect()
    }

    pub fn weight(&self, key: &str) -> Option<f64> {
        self.weights.get(key).copied()
    }

    /// Elementary codes of `key`, resolved at construction.
    pub fn codes(&self, key: &str) -> Option<&[u8]> {
        self.codes.get(key).map(Vec::as_slice)
    }

    /// `(key, codes)` pairs in layer order.
    pub fn layers(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.codes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl TryFrom<WeightsFields> for ClassWeights {
    type Error = CoclicoError;

    fn try_from(fields: WeightsFields) -> Result<Self> {
        match fields {
            WeightsFields::Separated { separator, classes } => Self::with_separator(classes, &separator),
            WeightsFields::Plain(classes) => Self::new(classes),
        }
    }
}

impl From<ClassWeights> for WeightsFields {
    fn from(weights: ClassWeights) -> Self {
        if weights.separator == DEFAULT_SEPARATOR {
            WeightsFields::Plain(weights.weights)
        } else {
            WeightsFields::Separated {
                separator: weights.separator,
                classes: weights.weights,
            }
        }
    }
}
