//! # single-pfdr
//!
//! Permutation-based false discovery rate control for feature-by-sample matrices, part of the
//! single-rust ecosystem.
//!
//! Given a matrix with one row per feature and one column per sample, plus one label per sample,
//! the crate decides for every feature whether to reject the null hypothesis of no association
//! with the labels while keeping the estimated false discovery rate at or below a target level.
//! The null distribution comes from random relabelings of the samples rather than from a
//! parametric model, so any per-feature statistic can be plugged in.
//!
//! ## Pipeline
//!
//! 1. One pre-transform is applied to the matrix (`log`, `rank`, `pa`, `norm`)
//! 2. The chosen statistic is computed per feature under the real labels
//! 3. The statistic is recomputed under `permutations` shuffled label vectors
//! 4. Null values numerically equal to the observed value are snapped onto it
//! 5. Observed and null values are rank transformed per feature
//! 6. Candidate rank thresholds are scanned for the one meeting the target FDR
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndarray::array;
//!
//! let data = array![[10.0, 12.0, 55.0, 60.0], [8.0, 9.0, 9.0, 8.0]];
//! let labels = array![0.0, 0.0, 1.0, 1.0];
//! let reject = single_pfdr::permutation_fdr(data, labels.view(), "meandiff", "log", 0.1, 1000)?;
//! # Ok::<(), single_pfdr::PfdrError>(())
//! ```
//!
//! ## Module Organization
//!
//! - **[`transform`]**: Data pre-transforms
//! - **[`testing`]**: Statistics, permutation nulls and the FDR threshold search

pub mod error;
pub mod testing;
pub mod transform;

pub use error::{PfdrError, Result};
pub use testing::statistic::{statistical_tests, CustomStatistic, StatisticRegistry, TestStatistic};
pub use testing::{PermutationFdr, PfdrConfig, PfdrResult, SearchMode};
pub use transform::{transform_functions, Transform};

use ndarray::{Array2, ArrayView1};

/// Reject vector for `data` (features × samples) against `labels`.
///
/// `statistical_test` must name a built-in statistic (see [`statistical_tests`]) and
/// `transform_function` a built-in transform (see [`transform_functions`]). Both are
/// resolved before any computation starts. `data` is transformed in place. Thresholds are
/// scanned upwards; see [`permutation_fdr_with_search`] for the descending scan.
pub fn permutation_fdr(
    data: Array2<f64>,
    labels: ArrayView1<f64>,
    statistical_test: &str,
    transform_function: &str,
    alpha: f64,
    permutations: usize,
) -> Result<Vec<bool>> {
    permutation_fdr_with_search(
        data,
        labels,
        statistical_test,
        transform_function,
        alpha,
        permutations,
        SearchMode::Ascending,
    )
}

/// Like [`permutation_fdr`] with an explicit threshold scan direction.
///
/// `SearchMode::from_fdrbefast(true)` selects the early-stopping descending scan.
pub fn permutation_fdr_with_search(
    data: Array2<f64>,
    labels: ArrayView1<f64>,
    statistical_test: &str,
    transform_function: &str,
    alpha: f64,
    permutations: usize,
    search: SearchMode,
) -> Result<Vec<bool>> {
    permutation_fdr_with_registry(
        &StatisticRegistry::default(),
        data,
        labels,
        statistical_test,
        transform_function,
        alpha,
        permutations,
        search,
    )
}

/// Like [`permutation_fdr_with_search`], additionally resolving custom statistics
/// registered in `registry`.
#[allow(clippy::too_many_arguments)]
pub fn permutation_fdr_with_registry(
    registry: &StatisticRegistry,
    data: Array2<f64>,
    labels: ArrayView1<f64>,
    statistical_test: &str,
    transform_function: &str,
    alpha: f64,
    permutations: usize,
    search: SearchMode,
) -> Result<Vec<bool>> {
    let statistic = registry.resolve(statistical_test)?;
    let transform: Transform = transform_function.parse()?;

    let config = PfdrConfig::new(statistic, transform)
        .with_alpha(alpha)
        .with_permutations(permutations)
        .with_search(search);

    let result = PermutationFdr::new(config)?.run(data, labels)?;
    Ok(result.reject)
}
