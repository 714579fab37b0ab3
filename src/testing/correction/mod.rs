//! Permutation FDR control: turning observed and null statistics into a
//! reject decision per feature.
//!
//! Null statistics first get snapped onto the observed value where the two
//! are numerically indistinguishable, then each feature's observed and null
//! values are replaced by their ranks among each other. The threshold search
//! then only ever compares integer ranks.

use crate::testing::permutation::NullDistribution;
use crate::testing::utils::{is_close, rank_min};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::collections::BTreeSet;

/// Overwrite null values that are numerically close to the observed value of
/// their feature with that observed value.
pub fn tie_correct(dist: &mut NullDistribution) {
    for (observed, mut null_row) in dist
        .observed
        .iter()
        .zip(dist.null.axis_iter_mut(Axis(0)))
    {
        for value in null_row.iter_mut() {
            if is_close(*observed, *value) {
                *value = *observed;
            }
        }
    }
}

/// Per-feature ranks of `[observed, null_1, ..., null_B]` under the minimum
/// tie rule.
#[derive(Debug, Clone)]
pub struct RankedStatistics {
    /// Rank of each feature's observed statistic, in `1..=B + 1`.
    pub observed: Array1<usize>,
    /// Rank of each null statistic within its feature.
    pub null: Array2<usize>,
}

impl RankedStatistics {
    pub fn num_permutations(&self) -> usize {
        self.null.ncols()
    }
}

/// Rank every feature's observed value jointly with its own null values.
///
/// Ranking never mixes features.
pub fn rank_transform(dist: &NullDistribution) -> RankedStatistics {
    let n_features = dist.observed.len();
    let n_perm = dist.num_permutations();

    let rows: Vec<Vec<usize>> = (0..n_features)
        .into_par_iter()
        .map(|row| {
            let mut combined = Vec::with_capacity(n_perm + 1);
            combined.push(dist.observed[row]);
            combined.extend(dist.null.row(row).iter().copied());
            rank_min(&combined)
        })
        .collect();

    let mut observed = Array1::zeros(n_features);
    let mut null = Array2::zeros((n_features, n_perm));
    for (row, ranks) in rows.into_iter().enumerate() {
        observed[row] = ranks[0];
        for (cperm, &rank) in ranks[1..].iter().enumerate() {
            null[[row, cperm]] = rank;
        }
    }

    RankedStatistics { observed, null }
}

/// Estimated FDR when rejecting every feature whose observed rank is at least `ct`.
///
/// With `R` features at or above the threshold and `V` null entries at or
/// above it, this is `(R + V) / (R (B + 1))`, or `(1 + V) / (B + 1)` when no
/// feature qualifies.
pub fn estimate_fdr(
    observed: ArrayView1<usize>,
    null: ArrayView2<usize>,
    ct: usize,
    permutations: usize,
) -> f64 {
    let realnum = observed.iter().filter(|&&t| t >= ct).count();
    let nullnum = null.iter().filter(|&&u| u >= ct).count();
    let denom = (permutations + 1) as f64;

    if realnum == 0 {
        (1 + nullnum) as f64 / denom
    } else {
        (realnum + nullnum) as f64 / (realnum as f64 * denom)
    }
}

/// One evaluated candidate threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FdrPoint {
    pub threshold: usize,
    pub fdr: f64,
}

/// Result of a threshold scan.
#[derive(Debug, Clone, Default)]
pub struct ThresholdOutcome {
    /// Operative rank cutoff, or `None` when no candidate reaches the target level.
    pub cutoff: Option<usize>,
    /// Every candidate evaluated, in scan order.
    pub curve: Vec<FdrPoint>,
}

impl ThresholdOutcome {
    /// Reject every feature whose observed rank reaches the cutoff.
    pub fn reject(&self, observed: ArrayView1<usize>) -> Vec<bool> {
        match self.cutoff {
            Some(ct) => observed.iter().map(|&t| t >= ct).collect(),
            None => vec![false; observed.len()],
        }
    }
}

fn candidate_thresholds(observed: ArrayView1<usize>) -> BTreeSet<usize> {
    observed.iter().copied().collect()
}

/// Step-up search: scan distinct observed ranks from low to high and keep the
/// first threshold whose estimated FDR is at most `alpha`.
///
/// The scan always visits every candidate so the full curve is reported.
pub fn search_ascending(ranked: &RankedStatistics, alpha: f64) -> ThresholdOutcome {
    let permutations = ranked.num_permutations();
    let mut outcome = ThresholdOutcome::default();

    for ct in candidate_thresholds(ranked.observed.view()) {
        let fdr = estimate_fdr(ranked.observed.view(), ranked.null.view(), ct, permutations);
        outcome.curve.push(FdrPoint { threshold: ct, fdr });

        if fdr <= alpha && outcome.cutoff.is_none() {
            outcome.cutoff = Some(ct);
        }
    }
    outcome
}

/// Step-down search: scan distinct observed ranks from high to low, keep the
/// last threshold whose estimated FDR is at most `alpha` and stop at the
/// first one that exceeds it.
pub fn search_descending(ranked: &RankedStatistics, alpha: f64) -> ThresholdOutcome {
    let permutations = ranked.num_permutations();
    let mut outcome = ThresholdOutcome::default();

    for ct in candidate_thresholds(ranked.observed.view()).into_iter().rev() {
        let fdr = estimate_fdr(ranked.observed.view(), ranked.null.view(), ct, permutations);
        outcome.curve.push(FdrPoint { threshold: ct, fdr });

        if fdr > alpha {
            break;
        }
        outcome.cutoff = Some(ct);
    }
    outcome
}
