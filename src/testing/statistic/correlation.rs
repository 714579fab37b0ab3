//! Correlation magnitude statistics.
//!
//! The statistic is the unnormalised `|dot(centered row, centered labels)|`.
//! Spearman variants rank both sides first. Non-zero variants restrict each
//! feature to the samples where that feature is non-zero.

use crate::testing::utils::rank_average;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

fn centered(values: Vec<f64>) -> Array1<f64> {
    let values = Array1::from(values);
    let mean = values.mean().unwrap_or(0.0);
    values.mapv(|v| v - mean)
}

/// Centered (and for Spearman, ranked) copies of the data rows and labels.
pub fn prepare_correlation(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    spearman: bool,
) -> (Array2<f64>, Array1<f64>) {
    let mut prepared = data.to_owned();
    for mut row in prepared.axis_iter_mut(Axis(0)) {
        let values = row.to_vec();
        let values = if spearman { rank_average(&values) } else { values };
        row.assign(&centered(values));
    }

    let labels = labels.to_vec();
    let labels = if spearman { rank_average(&labels) } else { labels };
    (prepared, centered(labels))
}

/// Centered values and labels of one feature restricted to its non-zero samples.
pub fn prepare_nonzero(
    row: ArrayView1<f64>,
    labels: ArrayView1<f64>,
    spearman: bool,
) -> (Array1<f64>, Array1<f64>) {
    let (values, labels): (Vec<f64>, Vec<f64>) = row
        .iter()
        .zip(labels.iter())
        .filter(|&(&v, _)| v != 0.0)
        .map(|(&v, &l)| (v, l))
        .unzip();

    if spearman {
        (centered(rank_average(&values)), centered(rank_average(&labels)))
    } else {
        (centered(values), centered(labels))
    }
}

pub fn correlation(data: ArrayView2<f64>, labels: ArrayView1<f64>, spearman: bool) -> Array1<f64> {
    let (prepared, labels) = prepare_correlation(data, labels, spearman);
    prepared.dot(&labels).mapv(f64::abs)
}

pub fn nonzero_correlation(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
    spearman: bool,
) -> Array1<f64> {
    data.axis_iter(Axis(0))
        .map(|row| {
            let (values, labels) = prepare_nonzero(row, labels, spearman);
            values.dot(&labels).abs()
        })
        .collect()
}
