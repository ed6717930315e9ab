//! Quintile scoring of recency, frequency and monetary values

use std::fmt;

use clap::ValueEnum;
use log::warn;
use serde::Serialize;

use crate::error::{Result, RfmError};
use crate::rfm::CustomerMetrics;

/// Number of score buckets per metric
pub const BUCKETS: usize = 5;

/// Score assigned when every value of a metric is identical
pub const NEUTRAL_SCORE: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Recency => "recency",
            Metric::Frequency => "frequency",
            Metric::Monetary => "monetary",
        };
        f.write_str(name)
    }
}

/// What to do when a metric has too few distinct values for five buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BinningPolicy {
    /// Fail with `InsufficientData` when two quintile edges coincide
    Strict,
    /// Drop duplicate edges and spread the remaining buckets over 1..=5
    #[default]
    Collapse,
}

/// The three 1-5 scores of one customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RfmScores {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScores {
    pub fn new(recency: u8, frequency: u8, monetary: u8) -> Self {
        Self {
            recency,
            frequency,
            monetary,
        }
    }

    /// Sum of the three scores, 3..=15
    pub fn total(&self) -> u8 {
        self.recency + self.frequency + self.monetary
    }

    /// Three-digit code such as "545"
    pub fn code(&self) -> String {
        format!("{}{}{}", self.recency, self.frequency, self.monetary)
    }
}

/// Linear interpolation in NumPy's form: the upper half is measured back
/// from `high`, so `t == 1` returns `high` exactly and `low == high` returns it unchanged.
fn lerp(low: f64, high: f64, t: f64) -> f64 {
    let diff = high - low;
    if t >= 0.5 {
        high - diff * (1.0 - t)
    } else {
        low + diff * t
    }
}

/// Calculate the `q` quantile (0.0..=1.0) with linear interpolation (NumPy compatible).
fn quantile(sorted_values: &[f64], q: f64) -> f64 {
    let n = sorted_values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted_values[0];
    }

    let rank = q * (n - 1) as f64;
    let lower = (rank.floor() as usize).min(n - 1);
    let upper = (lower + 1).min(n - 1);
    let frac = rank - lower as f64;

    lerp(sorted_values[lower], sorted_values[upper], frac)
}

/// The six edges delimiting five equal-population buckets.
///
/// Quantile fractions follow `linspace(0, 1, 6)`: `i * 0.2`, with the last one exactly 1.
pub fn quintile_edges(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let step = 1.0 / BUCKETS as f64;
    (0..=BUCKETS)
        .map(|i| if i == BUCKETS { 1.0 } else { i as f64 * step })
        .map(|q| quantile(&sorted, q))
        .collect()
}

/// Rank values 1..=n, ties broken by position (first occurrence ranks lower).
pub fn rank_first(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable, so equal values keep their input order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (position, index) in order.into_iter().enumerate() {
        ranks[index] = (position + 1) as f64;
    }
    ranks
}

/// Bucket index of `value`: bucket `i` holds `edges[i] < v <= edges[i + 1]`,
/// with the lowest edge included in bucket 0.
fn bucket_of(value: f64, edges: &[f64]) -> usize {
    let last = edges.len().saturating_sub(2);
    edges[1..]
        .iter()
        .position(|&upper| value <= upper)
        .unwrap_or(last)
        .min(last)
}

/// Map bucket `index` of `buckets` onto the 1..=5 scale.
fn spread_score(index: usize, buckets: usize) -> u8 {
    if buckets <= 1 {
        return NEUTRAL_SCORE;
    }
    let span = buckets - 1;
    let scaled = (index * (BUCKETS - 1) + span / 2) / span;
    (scaled + 1) as u8
}

/// Score each value 1..=5, smallest values lowest.
pub fn quintile_scores(values: &[f64], metric: Metric, policy: BinningPolicy) -> Result<Vec<u8>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let edges = quintile_edges(values);
    let mut distinct = edges.clone();
    distinct.dedup();

    if distinct.len() < edges.len() {
        match policy {
            BinningPolicy::Strict => {
                return Err(RfmError::InsufficientData {
                    metric,
                    reason: format!(
                        "quintile edges are not unique for {} customers ({} distinct edges)",
                        values.len(),
                        distinct.len()
                    ),
                });
            }
            BinningPolicy::Collapse => {
                warn!(
                    "{} has too few distinct values; scoring with {} buckets instead of {}",
                    metric,
                    distinct.len().saturating_sub(1).max(1),
                    BUCKETS
                );
            }
        }
    }

    let buckets = distinct.len().saturating_sub(1);
    if buckets == 0 {
        return Ok(vec![NEUTRAL_SCORE; values.len()]);
    }

    Ok(values
        .iter()
        .map(|&v| spread_score(bucket_of(v, &distinct), buckets))
        .collect())
}

/// Score every customer on all three metrics.
///
/// Recency is inverted (most recent gets 5). Frequency is ranked first so
/// equal counts still split across buckets. The whole customer set must be
/// present; scores depend on the population.
pub fn score_customers(
    customers: &[CustomerMetrics],
    policy: BinningPolicy,
) -> Result<Vec<RfmScores>> {
    let recency: Vec<f64> = customers.iter().map(|c| c.recency as f64).collect();
    let frequency: Vec<f64> = customers.iter().map(|c| c.frequency as f64).collect();
    let monetary: Vec<f64> = customers.iter().map(|c| c.monetary).collect();

    let recency_scores = quintile_scores(&recency, Metric::Recency, policy)?;
    let frequency_scores = quintile_scores(&rank_first(&frequency), Metric::Frequency, policy)?;
    let monetary_scores = quintile_scores(&monetary, Metric::Monetary, policy)?;

    Ok(recency_scores
        .into_iter()
        .zip(frequency_scores)
        .zip(monetary_scores)
        .map(|((r, f), m)| RfmScores::new(BUCKETS as u8 + 1 - r, f, m))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(values: &[(i64, u32, f64)]) -> Vec<CustomerMetrics> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(recency, frequency, monetary))| CustomerMetrics {
                customer_id: format!("c{}", i),
                recency,
                frequency,
                monetary,
            })
            .collect()
    }

    #[test]
    fn test_quantile_matches_numpy() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(quantile(&sorted, 0.0), 10.0);
        assert!((quantile(&sorted, 0.2) - 18.0).abs() < 1e-9);
        assert!((quantile(&sorted, 0.5) - 30.0).abs() < 1e-9);
        assert_eq!(quantile(&sorted, 1.0), 50.0);
    }

    #[test]
    fn test_lerp_hits_endpoints_exactly() {
        let (low, high) = (0.1, 0.7);
        assert_eq!(lerp(low, high, 0.0), low);
        assert_eq!(lerp(low, high, 1.0), high);
        assert_eq!(lerp(low, high, 0.75), high - (high - low) * 0.25);
        assert_eq!(lerp(low, high, 0.25), low + (high - low) * 0.25);
        assert_eq!(lerp(2.5, 2.5, 0.6), 2.5);
    }

    #[test]
    fn test_value_on_upper_interpolated_edge_stays_in_lower_bucket() {
        // Edge 4 lies at 80% of 0.1..0.7 over two values: 0.1 + 0.6 * 0.8
        let values = [0.1, 0.7];
        let edges = quintile_edges(&values);
        assert_eq!(edges[0], 0.1);
        assert_eq!(edges[5], 0.7);
        assert_eq!(edges[4], lerp(0.1, 0.7, 0.8));
        assert_eq!(bucket_of(edges[4], &edges), 3);
        assert_eq!(bucket_of(0.7, &edges), 4);
    }

    #[test]
    fn test_monetary_quintiles() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let scores = quintile_scores(&values, Metric::Monetary, BinningPolicy::Strict).unwrap();
        assert_eq!(scores, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_lowest_edge_is_inclusive() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let scores = quintile_scores(&values, Metric::Monetary, BinningPolicy::Strict).unwrap();
        assert_eq!(scores, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
    }

    #[test]
    fn test_rank_first_breaks_ties_by_position() {
        assert_eq!(rank_first(&[3.0, 1.0, 3.0, 1.0]), vec![3.0, 1.0, 4.0, 2.0]);
    }

    #[test]
    fn test_strict_policy_rejects_duplicate_edges() {
        let values = [1.0, 1.0, 1.0, 1.0, 2.0];
        let result = quintile_scores(&values, Metric::Recency, BinningPolicy::Strict);
        assert!(matches!(
            result,
            Err(RfmError::InsufficientData { metric: Metric::Recency, .. })
        ));
    }

    #[test]
    fn test_collapse_policy_spreads_remaining_buckets() {
        // Edges 1,1,1,1,1.2,2 collapse to 1,1.2,2: two buckets mapped to 1 and 5
        let values = [1.0, 1.0, 1.0, 1.0, 2.0];
        let scores = quintile_scores(&values, Metric::Monetary, BinningPolicy::Collapse).unwrap();
        assert_eq!(scores, vec![1, 1, 1, 1, 5]);
    }

    #[test]
    fn test_collapse_policy_identical_values_are_neutral() {
        let scores =
            quintile_scores(&[7.0, 7.0, 7.0], Metric::Monetary, BinningPolicy::Collapse).unwrap();
        assert_eq!(scores, vec![NEUTRAL_SCORE; 3]);
    }

    #[test]
    fn test_spread_score() {
        assert_eq!((0..5).map(|i| spread_score(i, 5)).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!((0..3).map(|i| spread_score(i, 3)).collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!((0..4).map(|i| spread_score(i, 4)).collect::<Vec<_>>(), vec![1, 2, 4, 5]);
        assert_eq!((0..2).map(|i| spread_score(i, 2)).collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn test_recency_is_inverted() {
        let customers = metrics(&[
            (1, 1, 10.0),
            (2, 1, 20.0),
            (3, 1, 30.0),
            (4, 1, 40.0),
            (5, 1, 50.0),
        ]);
        let scores = score_customers(&customers, BinningPolicy::Strict).unwrap();

        let recency: Vec<u8> = scores.iter().map(|s| s.recency).collect();
        assert_eq!(recency, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_equal_frequency_still_spans_all_scores() {
        let customers = metrics(&[
            (1, 2, 10.0),
            (2, 2, 20.0),
            (3, 2, 30.0),
            (4, 2, 40.0),
            (5, 2, 50.0),
        ]);
        let scores = score_customers(&customers, BinningPolicy::Strict).unwrap();

        let frequency: Vec<u8> = scores.iter().map(|s| s.frequency).collect();
        assert_eq!(frequency, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let customers = metrics(&[
            (3, 1, 5.0),
            (40, 7, 900.0),
            (12, 2, 55.5),
            (3, 1, 5.0),
            (100, 1, 1.0),
            (7, 4, 300.0),
            (1, 12, 1200.0),
        ]);
        let scores = score_customers(&customers, BinningPolicy::Collapse).unwrap();

        assert_eq!(scores.len(), customers.len());
        for s in &scores {
            for value in [s.recency, s.frequency, s.monetary] {
                assert!((1..=5).contains(&value));
            }
            assert!((3..=15).contains(&s.total()));
        }
    }

    #[test]
    fn test_scores_are_monotonic() {
        let customers = metrics(&[
            (30, 3, 80.0),
            (2, 9, 400.0),
            (15, 1, 20.0),
            (60, 5, 150.0),
            (9, 2, 35.0),
            (45, 7, 90.0),
            (1, 4, 600.0),
            (20, 6, 10.0),
        ]);
        let scores = score_customers(&customers, BinningPolicy::Collapse).unwrap();

        for (a, sa) in customers.iter().zip(&scores) {
            for (b, sb) in customers.iter().zip(&scores) {
                if a.recency < b.recency {
                    assert!(sa.recency >= sb.recency);
                }
                if a.frequency < b.frequency {
                    assert!(sa.frequency <= sb.frequency);
                }
                if a.monetary < b.monetary {
                    assert!(sa.monetary <= sb.monetary);
                }
            }
        }
    }

    #[test]
    fn test_single_customer() {
        let customers = metrics(&[(4, 2, 99.0)]);
        assert!(score_customers(&customers, BinningPolicy::Strict).is_err());

        let scores = score_customers(&customers, BinningPolicy::Collapse).unwrap();
        assert_eq!(scores, vec![RfmScores::new(3, 3, 3)]);
    }

    #[test]
    fn test_empty_customer_set() {
        assert!(score_customers(&[], BinningPolicy::Strict).unwrap().is_empty());
    }

    #[test]
    fn test_scores_code_and_total() {
        let scores = RfmScores::new(5, 4, 5);
        assert_eq!(scores.code(), "545");
        assert_eq!(scores.total(), 14);
    }
}
