//! Mean-based two-group statistics.

use crate::error::Result;
use crate::testing::utils::two_group_indices;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use statrs::statistics::Statistics;

/// `|mean(group 1) - mean(group 0)|` per feature.
pub fn mean_diff(data: ArrayView2<f64>, labels: ArrayView1<f64>) -> Result<Array1<f64>> {
    let (group0, group1) = two_group_indices(labels, 1)?;

    let mean0 = group_means(data, &group0);
    let mean1 = group_means(data, &group1);

    Ok((mean1 - mean0).mapv(f64::abs))
}

/// Mean difference divided by the sum of the two groups' sample standard deviations.
///
/// A feature that is constant within both groups has a zero denominator and
/// yields a non-finite value; the permutation engine scores those as zero.
pub fn std_mean_diff(data: ArrayView2<f64>, labels: ArrayView1<f64>) -> Result<Array1<f64>> {
    let (group0, group1) = two_group_indices(labels, 2)?;

    let stats: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|row| {
            let values = data.row(row);
            let x0: Vec<f64> = group0.iter().map(|&i| values[i]).collect();
            let x1: Vec<f64> = group1.iter().map(|&i| values[i]).collect();
            let diff = (x1.iter().mean() - x0.iter().mean()).abs();
            diff / (x1.iter().std_dev() + x0.iter().std_dev())
        })
        .collect();

    Ok(Array1::from(stats))
}

fn group_means(data: ArrayView2<f64>, indices: &[usize]) -> Array1<f64> {
    data.select(Axis(1), indices)
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(data.nrows()))
}
