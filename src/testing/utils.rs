use crate::error::{PfdrError, Result};
use ndarray::ArrayView1;

const CLOSE_RTOL: f64 = 1e-5;
const CLOSE_ATOL: f64 = 1e-8;

/// Floating point closeness with the usual `|a - b| <= atol + rtol * |b|` rule.
pub fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= CLOSE_ATOL + CLOSE_RTOL * b.abs()
}

// NaN sorts above every number and never ties, so each NaN takes its own top rank.
fn sorted_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// Rank values starting at 1, assigning tied values the average of their ranks.
pub fn rank_average(values: &[f64]) -> Vec<f64> {
    let order = sorted_order(values);
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let val = values[order[i]];
        let mut j = i + 1;

        // Find tied values
        while j < order.len() && values[order[j]] == val {
            j += 1;
        }

        let rank = (i + j - 1) as f64 / 2.0 + 1.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }

        i = j;
    }
    ranks
}

/// Rank values starting at 1, assigning tied values the lowest rank of their group.
pub fn rank_min(values: &[f64]) -> Vec<usize> {
    let order = sorted_order(values);
    let mut ranks = vec![0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let val = values[order[i]];
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == val {
            j += 1;
        }
        for &idx in &order[i..j] {
            ranks[idx] = i + 1;
        }
        i = j;
    }
    ranks
}

pub fn extract_unique_groups(group_ids: &[usize]) -> Vec<usize> {
    let mut unique_groups = group_ids.to_vec();
    unique_groups.sort();
    unique_groups.dedup();
    unique_groups
}

/// Convert a label vector into integer group ids, rejecting negative or fractional labels.
pub fn labels_to_groups(labels: ArrayView1<f64>) -> Result<Vec<usize>> {
    labels
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            if label.is_finite() && label >= 0.0 && label.fract() == 0.0 {
                Ok(label as usize)
            } else {
                Err(PfdrError::InvalidLabels(format!(
                    "label at index {} is {}, expected a non-negative integer",
                    i, label
                )))
            }
        })
        .collect()
}

/// Get sample indices for every distinct group, ordered by group id.
pub fn get_group_indices(group_ids: &[usize], unique_groups: &[usize]) -> Vec<Vec<usize>> {
    unique_groups
        .iter()
        .map(|&group| {
            group_ids
                .iter()
                .enumerate()
                .filter_map(|(i, &g)| if g == group { Some(i) } else { None })
                .collect()
        })
        .collect()
}

/// Split samples into group 0 and group 1, requiring binary labels with
/// at least `min_size` samples in each group.
pub fn two_group_indices(
    labels: ArrayView1<f64>,
    min_size: usize,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let group_ids = labels_to_groups(labels)?;
    if let Some(&bad) = group_ids.iter().find(|&&g| g > 1) {
        return Err(PfdrError::InvalidLabels(format!(
            "two-group statistics expect labels 0 or 1, found {}",
            bad
        )));
    }

    let mut groups = get_group_indices(&group_ids, &[0, 1]);
    let group1 = groups.pop().unwrap_or_default();
    let group0 = groups.pop().unwrap_or_default();

    if group0.len() < min_size || group1.len() < min_size {
        return Err(PfdrError::InvalidLabels(format!(
            "each group needs at least {} samples, got {} and {}",
            min_size,
            group0.len(),
            group1.len()
        )));
    }

    Ok((group0, group1))
}

/// Split samples into all distinct groups, requiring at least two of them.
pub fn multi_group_indices(labels: ArrayView1<f64>) -> Result<Vec<Vec<usize>>> {
    let group_ids = labels_to_groups(labels)?;
    let unique_groups = extract_unique_groups(&group_ids);
    if unique_groups.len() < 2 {
        return Err(PfdrError::InvalidLabels(format!(
            "multi-group statistics need at least 2 distinct labels, found {}",
            unique_groups.len()
        )));
    }
    Ok(get_group_indices(&group_ids, &unique_groups))
}
