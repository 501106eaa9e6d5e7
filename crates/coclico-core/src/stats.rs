//! Streaming statistics over masked raster cells.
//!
//! Each tile reduces to a `(max, count, mean, m2)` tuple where `m2` is the sum
//! of squared deviations from the mean. Tuples merge with Chan's parallel
//! variance update, so tiles can be reduced independently and combined in any
//! order or grouping:
//!
//! ```text
//!   count' = n_a + n_b
//!   delta  = mean_a - mean_b
//!   m2'    = m2_a + m2_b + delta² · n_a · n_b / count'
//!   mean'  = (n_a · mean_a + n_b · mean_b) / count'
//! ```
//!
//! A zero count always yields the zero tuple, never NaN; the zero tuple is the
//! identity of `merge`.
use std::iter::Sum;

use serde::{Deserialize, Serialize};

use crate::error::{CoclicoError, Result};

/// Running statistics over zero or more tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    pub max: f64,
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
}

/// Statistics of a single tile. Same shape as the aggregate it merges into.
pub type TileStat = AggregateStat;

/// Finalized statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub max: f64,
    pub count: u64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl AggregateStat {
    pub const ZERO: Self = Self {
        max: 0.0,
        count: 0,
        mean: 0.0,
        m2: 0.0,
    };

    /// Statistics of a plain list of values.
    pub fn of_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::ZERO;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let m2 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            max,
            count: values.len() as u64,
            mean,
            m2,
        }
    }

    /// Combine two partial aggregates.
    pub fn merge(self, other: Self) -> Self {
        let count = self.count + other.count;
        if count == 0 {
            return Self::ZERO;
        }
        // An empty side contributes nothing, its max included.
        if other.count == 0 {
            return self;
        }
        if self.count == 0 {
            return other;
        }
        let (na, nb, n) = (self.count as f64, other.count as f64, count as f64);
        let delta = self.mean - other.mean;
        Self {
            max: self.max.max(other.max),
            count,
            mean: (na * self.mean + nb * other.mean) / n,
            m2: self.m2 + other.m2 + delta * delta * na * nb / n,
        }
    }

    pub fn finalize(&self) -> StatSummary {
        if self.count == 0 {
            return StatSummary::default();
        }
        StatSummary {
            max: self.max,
            count: self.count,
            mean: self.mean,
            std: (self.m2 / self.count as f64).sqrt(),
        }
    }
}

impl Sum for AggregateStat {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::merge)
    }
}

impl FromIterator<AggregateStat> for AggregateStat {
    fn from_iter<I: IntoIterator<Item = AggregateStat>>(iter: I) -> Self {
        iter.into_iter().sum()
    }
}

/// Statistics of the cells of `values` selected by `mask` and holding data.
pub fn stat_of_raster(values: &[Option<f64>], mask: &[bool]) -> Result<TileStat> {
    if values.len() != mask.len() {
        return Err(CoclicoError::ShapeMismatch(format!(
            "{} values for a mask of {} cells",
            values.len(),
            mask.len()
        )));
    }

    let active = || {
        values
            .iter()
            .zip(mask)
            .filter_map(|(v, &m)| if m { *v } else { None })
    };

    let mut count = 0u64;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    for v in active() {
        count += 1;
        sum += v;
        max = max.max(v);
    }
    if count == 0 {
        return Ok(TileStat::ZERO);
    }
    let mean = sum / count as f64;
    let m2 = active().map(|v| (v - mean) * (v - mean)).sum();
    Ok(TileStat { max, count, mean, m2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: &AggregateStat, b: &AggregateStat) {
        assert_eq!(a.count, b.count);
        assert_relative_eq!(a.max, b.max, max_relative = 1e-9);
        assert_relative_eq!(a.mean, b.mean, max_relative = 1e-9, epsilon = 1e-12);
        assert_relative_eq!(a.m2, b.m2, max_relative = 1e-9, epsilon = 1e-9);
    }

    fn layer(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn single_raster_stats_follow_mask() {
        let values = layer(&[0.0, 0.0, 2.0, 1.0, 1.0, 2.0, 2.0, 2.0, 10.0]);
        let mask = [false, false, false, true, true, true, true, true, false];
        let stat = stat_of_raster(&values, &mask).unwrap();
        assert_eq!(stat.count, 5);
        assert_relative_eq!(stat.max, 2.0);
        assert_relative_eq!(stat.mean, 1.6);
        assert_relative_eq!(stat.m2, 2.0 * 0.6f64.powi(2) + 3.0 * 0.4f64.powi(2), epsilon = 1e-12);

        let values = layer(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 15.0, 3.0, 4.0]);
        let mask = [false, true, true, false, true, true, false, true, true];
        let stat = stat_of_raster(&values, &mask).unwrap();
        assert_eq!(stat.count, 6);
        assert_relative_eq!(stat.max, 4.0);
        assert_relative_eq!(stat.mean, 1.5);
        let expected_m2 = 2.0 * 1.5f64.powi(2) + 2.0 * 0.5f64.powi(2) + 1.5f64.powi(2) + 2.5f64.powi(2);
        assert_relative_eq!(stat.m2, expected_m2, epsilon = 1e-12);
        assert_relative_eq!(stat.finalize().std.powi(2), expected_m2 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn cells_without_data_are_skipped() {
        let values = vec![Some(1.0), None, Some(3.0)];
        let stat = stat_of_raster(&values, &[true, true, true]).unwrap();
        assert_eq!(stat.count, 2);
        assert_relative_eq!(stat.mean, 2.0);
    }

    #[test]
    fn empty_mask_gives_zero_not_nan() {
        let stat = stat_of_raster(&layer(&[5.0, -2.0]), &[false, false]).unwrap();
        assert_eq!(stat, TileStat::ZERO);
        let summary = stat.finalize();
        assert_eq!(summary, StatSummary::default());
        assert!(!summary.std.is_nan());
    }

    #[test]
    fn mismatched_mask_is_an_error() {
        assert!(stat_of_raster(&layer(&[1.0]), &[true, false]).is_err());
    }

    #[test]
    fn merging_zero_count_is_identity() {
        let agg = AggregateStat::of_values(&[1.0, 4.0, -2.0]);
        assert_eq!(agg.merge(TileStat::ZERO), agg);
        assert_eq!(TileStat::ZERO.merge(agg), agg);
        assert_eq!(TileStat::ZERO.merge(TileStat::ZERO), TileStat::ZERO);
    }

    #[test]
    fn merge_matches_stats_of_concatenation() {
        let a = [1.0, 2.0, 3.5];
        let b = [10.0, -4.0];
        let merged = AggregateStat::of_values(&a).merge(AggregateStat::of_values(&b));
        let all: Vec<f64> = a.iter().chain(&b).copied().collect();
        assert_close(&merged, &AggregateStat::of_values(&all));
    }

    #[test]
    fn merge_is_associative_over_random_partitions() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let n_tiles = rng.gen_range(1..12);
            let tiles: Vec<TileStat> = (0..n_tiles)
                .map(|_| {
                    let n = rng.gen_range(0..40);
                    let values: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..50.0)).collect();
                    AggregateStat::of_values(&values)
                })
                .collect();

            let sequential: AggregateStat = tiles.iter().copied().sum();

            let mut groups: Vec<Vec<TileStat>> = Vec::new();
            for t in &tiles {
                if groups.is_empty() || rng.gen_bool(0.4) {
                    groups.push(Vec::new());
                }
                groups.last_mut().unwrap().push(*t);
            }
            let grouped: AggregateStat = groups
                .into_iter()
                .map(|g| g.into_iter().collect::<AggregateStat>())
                .collect();
            assert_close(&grouped, &sequential);

            let mut shuffled = tiles.clone();
            shuffled.shuffle(&mut rng);
            assert_close(&shuffled.into_iter().sum(), &sequential);
        }
    }

    #[test]
    fn chained_tiles_match_concatenated_raster() {
        let values: Vec<f64> = (0..60).map(|v| v as f64).collect();
        let masks: [Vec<bool>; 3] = [
            values.iter().map(|v| *v as i64 % 3 != 0).collect(),
            values.iter().map(|v| *v as i64 % 2 != 0).collect(),
            values.iter().map(|v| *v > 0.0).collect(),
        ];

        let mut total = AggregateStat::ZERO;
        for mask in &masks {
            total = total.merge(stat_of_raster(&layer(&values), mask).unwrap());
        }

        let concatenated: Vec<f64> = masks
            .iter()
            .flat_map(|m| values.iter().zip(m).filter(|(_, k)| **k).map(|(v, _)| *v))
            .collect();
        let expected = AggregateStat::of_values(&concatenated);
        assert_close(&total, &expected);
        assert_relative_eq!(total.finalize().std, expected.finalize().std, max_relative = 1e-9);
    }

    #[test]
    fn absolute_difference_series_is_order_independent() {
        let tile_1 = AggregateStat::of_values(&[(12.0f64 - 10.0).abs()]);
        let tile_2 = AggregateStat::of_values(&[(8.0f64 - 10.0).abs()]);
        for agg in [tile_1.merge(tile_2), tile_2.merge(tile_1)] {
            let s = agg.finalize();
            assert_eq!(s.count, 2);
            assert_relative_eq!(s.mean, 2.0);
            assert_relative_eq!(s.std, 0.0);
            assert_relative_eq!(s.max, 2.0);
        }
    }
}
