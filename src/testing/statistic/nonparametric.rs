use crate::error::Result;
use crate::testing::utils::{multi_group_indices, rank_average, two_group_indices};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;

/// Mann-Whitney U of group 0 against group 1 for every feature.
pub fn mann_whitney_matrix(data: ArrayView2<f64>, labels: ArrayView1<f64>) -> Result<Array1<f64>> {
    let (group0, group1) = two_group_indices(labels, 1)?;

    let results: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|row| {
            let values = data.row(row);
            let x: Vec<f64> = group0.iter().map(|&i| values[i]).collect();
            let y: Vec<f64> = group1.iter().map(|&i| values[i]).collect();
            mann_whitney_u(&x, &y)
        })
        .collect();

    Ok(Array1::from(results))
}

/// U statistic of `x`: the number of (x, y) pairs with x > y, ties counting one half.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> f64 {
    let nx = x.len();
    let ny = y.len();

    if nx == 0 || ny == 0 {
        return 0.0;
    }

    // Combine samples and assign group labels (0 for x, 1 for y)
    let mut combined: Vec<(f64, usize)> = Vec::with_capacity(nx + ny);
    combined.extend(x.iter().map(|&v| (v, 0)));
    combined.extend(y.iter().map(|&v| (v, 1)));

    combined.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Assign ranks (with ties averaged)
    let values: Vec<f64> = combined.iter().map(|&(v, _)| v).collect();
    let ranks = rank_average(&values);

    let rank_sum_x: f64 = combined
        .iter()
        .zip(ranks.iter())
        .filter(|((_, group), _)| *group == 0)
        .map(|(_, &rank)| rank)
        .sum();

    rank_sum_x - (nx * (nx + 1)) as f64 / 2.0
}

/// One tie-corrected Kruskal-Wallis H statistic per feature.
pub fn kruskal_wallis_matrix(
    data: ArrayView2<f64>,
    labels: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    let groups = multi_group_indices(labels)?;

    let results: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|row| {
            let values = data.row(row);
            let samples: Vec<Vec<f64>> = groups
                .iter()
                .map(|indices| indices.iter().map(|&i| values[i]).collect())
                .collect();
            kruskal_wallis_h(&samples)
        })
        .collect();

    Ok(Array1::from(results))
}

/// Kruskal-Wallis H over `groups`, corrected for ties.
///
/// Returns `0.0` when every observation is tied.
pub fn kruskal_wallis_h(groups: &[Vec<f64>]) -> f64 {
    let pooled: Vec<f64> = groups.iter().flatten().copied().collect();
    let n = pooled.len();
    if n < 2 {
        return 0.0;
    }

    let ranks = rank_average(&pooled);

    let mut offset = 0;
    let mut weighted = 0.0;
    for group in groups.iter().filter(|g| !g.is_empty()) {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        weighted += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let n_f = n as f64;
    let h = 12.0 / (n_f * (n_f + 1.0)) * weighted - 3.0 * (n_f + 1.0);

    let correction = 1.0 - tie_term(&pooled) / (n_f.powi(3) - n_f);
    if correction <= 0.0 {
        return 0.0;
    }
    h / correction
}

/// Sum of `t^3 - t` over every group of tied values.
fn tie_term(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut total = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let t = (j - i) as f64;
        total += t * t * t - t;
        i = j;
    }
    total
}
