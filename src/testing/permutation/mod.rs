//! Permutation null distributions.
//!
//! Each permutation draws a fresh shuffle of the caller's labels from the
//! supplied random generator and recomputes the statistic under it. The
//! caller's label vector is never mutated. Draws happen sequentially in a
//! fixed order, so a seeded generator reproduces the null matrix exactly.

use crate::error::Result;
use crate::testing::statistic::TestStatistic;
use crate::testing::statistic::correlation::{prepare_correlation, prepare_nonzero};
use crate::testing::utils::two_group_indices;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;

/// Observed statistics together with their permutation null.
#[derive(Debug, Clone)]
pub struct NullDistribution {
    /// One statistic per feature under the real labels.
    pub observed: Array1<f64>,
    /// Features × permutations matrix of statistics under shuffled labels.
    pub null: Array2<f64>,
}

impl NullDistribution {
    pub fn num_permutations(&self) -> usize {
        self.null.ncols()
    }

    /// Replace non-finite statistics with zero, returning how many were replaced.
    pub fn sanitize(&mut self) -> usize {
        let mut replaced = 0;
        for value in self.observed.iter_mut().chain(self.null.iter_mut()) {
            if !value.is_finite() {
                *value = 0.0;
                replaced += 1;
            }
        }
        replaced
    }
}

/// An independent shuffled copy of `labels`.
fn shuffled<R>(labels: ArrayView1<f64>, rng: &mut R) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    let mut permuted = labels.to_vec();
    permuted.shuffle(rng);
    permuted
}

/// Compute the observed statistic and `permutations` null draws for it.
///
/// Dispatches to a specialised path where one exists: matrix products for
/// `meandiff` and the correlation statistics, and per-feature shuffles of the
/// non-zero label subsets for the non-zero correlations. Every other
/// statistic, custom ones included, is recomputed in full per permutation.
pub fn permute<R>(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    statistic: &TestStatistic,
    permutations: usize,
    rng: &mut R,
) -> Result<NullDistribution>
where
    R: Rng + ?Sized,
{
    log::debug!(
        "drawing {} permutations of '{}' over {} features",
        permutations,
        statistic,
        data.nrows()
    );
    match statistic {
        TestStatistic::MeanDiff => permute_mean_diff(data, labels, permutations, rng),
        TestStatistic::Spearman => Ok(permute_correlation(data, labels, true, permutations, rng)),
        TestStatistic::Pearson => Ok(permute_correlation(data, labels, false, permutations, rng)),
        TestStatistic::NonZeroSpearman => {
            Ok(permute_nonzero(data, labels, true, permutations, rng))
        }
        TestStatistic::NonZeroPearson => {
            Ok(permute_nonzero(data, labels, false, permutations, rng))
        }
        _ => permute_generic(data, labels, statistic, permutations, rng),
    }
}

/// Full recomputation of the statistic for every shuffled label vector.
pub fn permute_generic<R>(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    statistic: &TestStatistic,
    permutations: usize,
    rng: &mut R,
) -> Result<NullDistribution>
where
    R: Rng + ?Sized,
{
    let observed = statistic.compute(data, labels)?;
    let mut null = Array2::zeros((data.nrows(), permutations));

    for cperm in 0..permutations {
        let rlabels = Array1::from(shuffled(labels, rng));
        let stats = statistic.compute(data, rlabels.view())?;
        null.column_mut(cperm).assign(&stats);
    }

    Ok(NullDistribution { observed, null })
}

/// Mean difference null via a single matrix product.
///
/// Column `c` of the weight matrix holds `1/n1` for samples assigned to group
/// 1 and `-1/n0` for group 0 under permutation `c`, so `data · W` yields the
/// signed mean differences of every permutation at once.
pub fn permute_mean_diff<R>(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    permutations: usize,
    rng: &mut R,
) -> Result<NullDistribution>
where
    R: Rng + ?Sized,
{
    let observed = TestStatistic::MeanDiff.compute(data, labels)?;
    let (group0, group1) = two_group_indices(labels, 1)?;
    let k0 = 1.0 / group0.len() as f64;
    let k1 = 1.0 / group1.len() as f64;

    let mut weights = Array2::zeros((data.ncols(), permutations));
    for mut column in weights.axis_iter_mut(Axis(1)) {
        let rlabels = shuffled(labels, rng);
        for (w, &label) in column.iter_mut().zip(rlabels.iter()) {
            *w = if label == 1.0 { k1 } else { -k0 };
        }
    }

    let null = data.dot(&weights).mapv(f64::abs);
    Ok(NullDistribution { observed, null })
}

/// Correlation null from shuffled copies of the prepared (centered) labels.
pub fn permute_correlation<R>(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    spearman: bool,
    permutations: usize,
    rng: &mut R,
) -> NullDistribution
where
    R: Rng + ?Sized,
{
    let (prepared, centered_labels) = prepare_correlation(data, labels, spearman);
    let observed = prepared.dot(&centered_labels).mapv(f64::abs);

    let mut permuted_labels = Array2::zeros((centered_labels.len(), permutations));
    for mut column in permuted_labels.axis_iter_mut(Axis(1)) {
        column.assign(&Array1::from(shuffled(centered_labels.view(), rng)));
    }

    let null = prepared.dot(&permuted_labels).mapv(f64::abs);
    NullDistribution { observed, null }
}

/// Non-zero correlation null: each feature shuffles only its own non-zero label subset.
pub fn permute_nonzero<R>(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    spearman: bool,
    permutations: usize,
    rng: &mut R,
) -> NullDistribution
where
    R: Rng + ?Sized,
{
    let mut observed = Array1::zeros(data.nrows());
    let mut null = Array2::zeros((data.nrows(), permutations));

    for (i, row) in data.axis_iter(Axis(0)).enumerate() {
        let (values, subset_labels) = prepare_nonzero(row, labels, spearman);
        observed[i] = values.dot(&subset_labels).abs();

        for cperm in 0..permutations {
            let rlabels = Array1::from(shuffled(subset_labels.view(), rng));
            null[[i, cperm]] = values.dot(&rlabels).abs();
        }
    }

    NullDistribution { observed, null }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_data() -> (Array2<f64>, Array1<f64>) {
        let data = array![
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            [0.0, 3.0, 0.0, 1.0, 7.0, 2.0],
            [4.0, 4.0, 4.0, 1.0, 1.0, 1.0]
        ];
        let labels = array![0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        (data, labels)
    }

    #[test]
    fn test_mean_diff_fast_path_matches_generic() {
        let (data, labels) = sample_data();
        let mut rng_fast = StdRng::seed_from_u64(7);
        let mut rng_generic = StdRng::seed_from_u64(7);

        let fast = permute_mean_diff(data.view(), labels.view(), 25, &mut rng_fast).unwrap();
        let generic = permute_generic(
            data.view(),
            labels.view(),
            &TestStatistic::MeanDiff,
            25,
            &mut rng_generic,
        )
        .unwrap();

        assert_eq!(fast.observed, generic.observed);
        for (a, b) in fast.null.iter().zip(generic.null.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_correlation_path_matches_generic() {
        let (data, labels) = sample_data();
        let labels = labels + array![0.0, 0.5, 2.0, 3.5, 1.0, 4.0];
        for (statistic, spearman) in [(TestStatistic::Pearson, false), (TestStatistic::Spearman, true)] {
            let mut rng_fast = StdRng::seed_from_u64(11);
            let mut rng_generic = StdRng::seed_from_u64(11);
            let fast = permute_correlation(data.view(), labels.view(), spearman, 10, &mut rng_fast);
            let generic =
                permute_generic(data.view(), labels.view(), &statistic, 10, &mut rng_generic)
                    .unwrap();
            for (a, b) in fast.observed.iter().zip(generic.observed.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
            }
            for (a, b) in fast.null.iter().zip(generic.null.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_caller_labels_untouched() {
        let (data, labels) = sample_data();
        let original = labels.clone();
        let mut rng = StdRng::seed_from_u64(3);
        permute(data.view(), labels.view(), &TestStatistic::MeanDiff, 50, &mut rng).unwrap();
        assert_eq!(labels, original);
    }

    #[test]
    fn test_null_shape_and_reproducibility() {
        let (data, labels) = sample_data();
        for statistic in [
            TestStatistic::MeanDiff,
            TestStatistic::StdMeanDiff,
            TestStatistic::MannWhitney,
            TestStatistic::KruskalWallis,
            TestStatistic::NonZeroSpearman,
            TestStatistic::NonZeroPearson,
        ] {
            let a = permute(data.view(), labels.view(), &statistic, 12, &mut StdRng::seed_from_u64(5))
                .unwrap();
            let b = permute(data.view(), labels.view(), &statistic, 12, &mut StdRng::seed_from_u64(5))
                .unwrap();
            assert_eq!(a.null.dim(), (3, 12), "{}", statistic);
            assert_eq!(a.observed.len(), 3);
            assert_eq!(a.null, b.null, "{}", statistic);
        }
    }

    #[test]
    fn test_nonzero_null_stays_within_subset() {
        // a feature with a single non-zero sample has a zero statistic under every shuffle
        let data = array![[0.0, 0.0, 9.0, 0.0]];
        let labels = array![1.0, 2.0, 3.0, 4.0];
        let mut rng = StdRng::seed_from_u64(1);
        let dist = permute_nonzero(data.view(), labels.view(), false, 8, &mut rng);
        assert_eq!(dist.observed[0], 0.0);
        assert!(dist.null.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sanitize_replaces_non_finite() {
        let mut dist = NullDistribution {
            observed: array![f64::NAN, 1.0],
            null: array![[f64::INFINITY, 2.0], [3.0, 4.0]],
        };
        assert_eq!(dist.sanitize(), 2);
        assert_eq!(dist.observed, array![0.0, 1.0]);
        assert_eq!(dist.null[[0, 0]], 0.0);
    }
}
