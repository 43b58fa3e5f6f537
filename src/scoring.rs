//! Quantile binning of metric columns into ordinal scores

use crate::config::DegenerateBinning;
use crate::error::{RfmError, RfmResult};

/// Direction in which bucket indices map to scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Lowest bucket scores 1
    Ascending,
    /// Lowest bucket scores `buckets`
    Descending,
}

/// Equal-population bucket edges fitted on one metric column
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    edges: Vec<f64>,
}

impl QuantileBins {
    /// Fit `buckets` edges by linear interpolation over the sorted values.
    ///
    /// Fails when the values are empty or produce repeated edges.
    pub fn fit(values: &[f64], buckets: u8) -> Result<Self, String> {
        if values.is_empty() {
            return Err("no values".to_string());
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err("non-finite value".to_string());
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let k = buckets as usize;
        let edges: Vec<f64> = (0..=k).map(|i| interpolate(&sorted, i, k)).collect();

        if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(format!("duplicate bin edge {}", w[1]));
        }

        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn buckets(&self) -> usize {
        self.edges.len() - 1
    }

    /// Zero-based bucket of `value`; buckets are right-closed, so a value
    /// equal to an interior edge lands in the lower bucket
    pub fn bucket(&self, value: f64) -> usize {
        let inner = &self.edges[1..self.edges.len() - 1];
        inner.partition_point(|&edge| edge < value)
    }
}

/// Linear-interpolated `i/k` quantile of pre-sorted data
fn interpolate(sorted: &[f64], i: usize, k: usize) -> f64 {
    let h = ((sorted.len() - 1) * i) as f64 / k as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// 1-based ranks where equal values keep input order
pub fn first_seen_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = (position + 1) as f64;
    }
    ranks
}

fn to_score(bucket: usize, buckets: u8, order: ScoreOrder) -> u8 {
    match order {
        ScoreOrder::Ascending => bucket as u8 + 1,
        ScoreOrder::Descending => buckets - bucket as u8,
    }
}

/// Bucket every value and require all buckets to be populated
fn strict_buckets(metric: &'static str, values: &[f64], buckets: u8) -> RfmResult<Vec<usize>> {
    let binning_error = |reason: String| RfmError::Binning {
        metric,
        buckets,
        reason,
    };

    if values.len() < buckets as usize {
        return Err(binning_error(format!(
            "{} rows is fewer than {} buckets",
            values.len(),
            buckets
        )));
    }

    let bins = QuantileBins::fit(values, buckets).map_err(binning_error)?;
    log::debug!("{metric} bin edges: {:?}", bins.edges());
    let assigned: Vec<usize> = values.iter().map(|&v| bins.bucket(v)).collect();

    let mut counts = vec![0usize; bins.buckets()];
    for &bucket in &assigned {
        counts[bucket] += 1;
    }
    if let Some(empty) = counts.iter().position(|&count| count == 0) {
        return Err(binning_error(format!("bucket {} is empty", empty + 1)));
    }

    Ok(assigned)
}

/// Bucket by first-seen rank, tolerating empty buckets when rows are scarce
fn rank_buckets(values: &[f64], buckets: u8) -> Vec<usize> {
    if values.len() == 1 {
        return vec![buckets as usize / 2];
    }
    let ranks = first_seen_ranks(values);
    match QuantileBins::fit(&ranks, buckets) {
        Ok(bins) => ranks.iter().map(|&r| bins.bucket(r)).collect(),
        // only reachable for empty input
        Err(_) => Vec::new(),
    }
}

/// Score a metric column on its raw values
pub fn quantile_scores(
    metric: &'static str,
    values: &[f64],
    buckets: u8,
    order: ScoreOrder,
    policy: DegenerateBinning,
) -> RfmResult<Vec<u8>> {
    let assigned = match strict_buckets(metric, values, buckets) {
        Ok(assigned) => assigned,
        Err(err) if policy == DegenerateBinning::RankFallback && !values.is_empty() => {
            log::warn!("{err}; falling back to rank binning");
            rank_buckets(values, buckets)
        }
        Err(err) => return Err(err),
    };

    Ok(assigned
        .into_iter()
        .map(|bucket| to_score(bucket, buckets, order))
        .collect())
}

/// Score a metric column on its first-seen ranks, so heavy ties still split
/// into equal-population buckets
pub fn ranked_quantile_scores(
    metric: &'static str,
    values: &[f64],
    buckets: u8,
    order: ScoreOrder,
    policy: DegenerateBinning,
) -> RfmResult<Vec<u8>> {
    let ranks = first_seen_ranks(values);
    quantile_scores(metric, &ranks, buckets, order, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(scores: &[u8], buckets: u8) -> Vec<usize> {
        (1..=buckets)
            .map(|s| scores.iter().filter(|&&x| x == s).count())
            .collect()
    }

    #[test]
    fn test_fit_edges_interpolate() {
        let values: Vec<f64> = (1..=11).map(f64::from).collect();
        let bins = QuantileBins::fit(&values, 5).unwrap();
        assert_eq!(bins.edges(), &[1.0, 3.0, 5.0, 7.0, 9.0, 11.0]);
        assert_eq!(bins.buckets(), 5);
    }

    #[test]
    fn test_boundary_ties_go_to_lower_bucket() {
        let values: Vec<f64> = (1..=11).map(f64::from).collect();
        let bins = QuantileBins::fit(&values, 5).unwrap();
        assert_eq!(bins.bucket(1.0), 0);
        assert_eq!(bins.bucket(3.0), 0);
        assert_eq!(bins.bucket(3.5), 1);
        assert_eq!(bins.bucket(5.0), 1);
        assert_eq!(bins.bucket(11.0), 4);
    }

    #[test]
    fn test_fit_rejects_duplicate_edges() {
        let values = [1.0, 1.0, 1.0, 1.0, 2.0, 3.0];
        assert!(QuantileBins::fit(&values, 5).is_err());
        assert!(QuantileBins::fit(&[], 5).is_err());
    }

    #[test]
    fn test_bucket_balance() {
        let values: Vec<f64> = (0..23).map(|i| (i * 7 % 23) as f64 * 1.5).collect();
        let scores = quantile_scores(
            "monetary",
            &values,
            5,
            ScoreOrder::Ascending,
            DegenerateBinning::Reject,
        )
        .unwrap();
        for count in counts(&scores, 5) {
            assert!(count == 4 || count == 5, "unbalanced bucket size {count}");
        }
    }

    #[test]
    fn test_descending_scores() {
        let values = [10.0, 1.0, 50.0, 3.0, 20.0];
        let scores = quantile_scores(
            "recency",
            &values,
            5,
            ScoreOrder::Descending,
            DegenerateBinning::Reject,
        )
        .unwrap();
        assert_eq!(scores, vec![3, 5, 1, 4, 2]);
    }

    #[test]
    fn test_first_seen_ranks() {
        let ranks = first_seen_ranks(&[2.0, 1.0, 2.0, 1.0, 3.0]);
        assert_eq!(ranks, vec![3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_ranked_scores_split_heavy_ties() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 5.0];
        let scores = ranked_quantile_scores(
            "frequency",
            &values,
            5,
            ScoreOrder::Ascending,
            DegenerateBinning::Reject,
        )
        .unwrap();
        assert_eq!(scores, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
    }

    #[test]
    fn test_degenerate_distribution_rejected() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 2.0];
        let result = quantile_scores(
            "monetary",
            &values,
            5,
            ScoreOrder::Ascending,
            DegenerateBinning::Reject,
        );
        assert!(matches!(
            result,
            Err(RfmError::Binning {
                metric: "monetary",
                buckets: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let result = quantile_scores(
            "recency",
            &[1.0, 2.0, 3.0],
            5,
            ScoreOrder::Descending,
            DegenerateBinning::Reject,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rank_fallback_spreads_small_inputs() {
        let scores = quantile_scores(
            "recency",
            &[1.0, 30.0, 300.0],
            5,
            ScoreOrder::Descending,
            DegenerateBinning::RankFallback,
        )
        .unwrap();
        assert_eq!(scores, vec![5, 3, 1]);

        let single = quantile_scores(
            "monetary",
            &[42.0],
            5,
            ScoreOrder::Ascending,
            DegenerateBinning::RankFallback,
        )
        .unwrap();
        assert_eq!(single, vec![3]);
    }

    #[test]
    fn test_monotonic_ascending() {
        let values = [5.0, 9.0, 1.0, 7.0, 3.0, 8.0, 2.0, 6.0, 4.0, 10.0, 3.0, 7.0];
        let scores = quantile_scores(
            "monetary",
            &values,
            5,
            ScoreOrder::Ascending,
            DegenerateBinning::Reject,
        )
        .unwrap();
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] < values[j] {
                    assert!(scores[i] <= scores[j]);
                }
            }
        }
    }
}
