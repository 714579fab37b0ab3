//! Data pre-transforms applied to the feature-by-sample matrix before any
//! statistic is computed.
//!
//! Every transform works in place on the matrix it is handed. Callers that
//! still need the raw values afterwards must pass a copy.
//!
//! ## Available Transforms
//!
//! - **log** (`log`): floor every entry at 2, then take the base-2 logarithm
//! - **rank** (`rank`): replace each feature's values by their ranks across samples
//! - **pa** (`pa`): presence/absence, every nonzero entry becomes 1
//! - **norm** (`norm`): divide every sample column by its column sum

use crate::error::{PfdrError, Result};
use crate::testing::utils::rank_average;
use ndarray::{Array2, Axis};
use std::fmt;
use std::str::FromStr;

/// Lower bound applied by the `log` transform before taking the logarithm.
pub const LOG_FLOOR: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Log,
    Rank,
    PresenceAbsence,
    Normalize,
}

impl Transform {
    pub const ALL: [Transform; 4] = [
        Transform::Log,
        Transform::Rank,
        Transform::PresenceAbsence,
        Transform::Normalize,
    ];

    /// Registry name of the transform.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Log => "log",
            Transform::Rank => "rank",
            Transform::PresenceAbsence => "pa",
            Transform::Normalize => "norm",
        }
    }

    /// Apply the transform to `data` in place.
    pub fn apply(&self, data: &mut Array2<f64>) {
        log::debug!(
            "applying '{}' transform to {}x{} matrix",
            self.name(),
            data.nrows(),
            data.ncols()
        );
        match self {
            Transform::Log => log_data(data),
            Transform::Rank => rank_data(data),
            Transform::PresenceAbsence => presence_absence_data(data),
            Transform::Normalize => normalize_data(data),
        }
    }
}

impl FromStr for Transform {
    type Err = PfdrError;

    fn from_str(name: &str) -> Result<Self> {
        Transform::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| PfdrError::UnknownTransform(name.to_string()))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of every recognised transform.
pub fn transform_functions() -> Vec<&'static str> {
    Transform::ALL.iter().map(Transform::name).collect()
}

/// Floor entries at [`LOG_FLOOR`] and take log2.
///
/// Values below the floor, including zeros, negatives and NaN, are clipped
/// rather than rejected so that raw count tables can be passed straight in.
pub fn log_data(data: &mut Array2<f64>) {
    data.mapv_inplace(|x| {
        // NaN compares false, so test the accepted range instead of `x < 2`
        let clipped = if x >= LOG_FLOOR { x } else { LOG_FLOOR };
        clipped.log2()
    });
}

/// Replace every row with its average-tie ranks.
pub fn rank_data(data: &mut Array2<f64>) {
    for mut row in data.axis_iter_mut(Axis(0)) {
        let ranks = rank_average(&row.to_vec());
        for (value, rank) in row.iter_mut().zip(ranks) {
            *value = rank;
        }
    }
}

pub fn presence_absence_data(data: &mut Array2<f64>) {
    data.mapv_inplace(|x| if x != 0.0 { 1.0 } else { 0.0 });
}

/// Divide each sample column by its sum. Columns summing to zero are left untouched.
pub fn normalize_data(data: &mut Array2<f64>) {
    for mut column in data.axis_iter_mut(Axis(1)) {
        let total = column.sum();
        if total != 0.0 {
            column.mapv_inplace(|x| x / total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_log_clips_below_floor() {
        let mut data = array![[0.0, 1.0, 3.0, 4.0]];
        log_data(&mut data);
        let expected = [1.0, 1.0, 3.0_f64.log2(), 2.0];
        for (a, e) in data.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *e, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(data[[0, 2]], 1.585, epsilon = 1e-3);
    }

    #[test]
    fn test_log_clips_negative_and_nan() {
        let mut data = array![[-5.0, f64::NAN]];
        log_data(&mut data);
        assert_eq!(data, array![[1.0, 1.0]]);
    }

    #[test]
    fn test_presence_absence() {
        let mut data = array![[0.0, 2.0, 0.0, 5.0]];
        presence_absence_data(&mut data);
        assert_eq!(data, array![[0.0, 1.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_normalize_columns() {
        let mut data = array![[2.0, 0.0], [2.0, 0.0], [4.0, 0.0]];
        normalize_data(&mut data);
        assert_abs_diff_eq!(data[[0, 0]], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(data[[1, 0]], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(data[[2, 0]], 0.5, epsilon = 1e-12);
        // zero-sum column stays zero
        assert_eq!(data.column(1).sum(), 0.0);
    }

    #[test]
    fn test_rank_rows_independently() {
        let mut data = array![[3.0, 1.0, 2.0], [5.0, 5.0, 1.0]];
        rank_data(&mut data);
        assert_eq!(data, array![[3.0, 1.0, 2.0], [2.5, 2.5, 1.0]]);
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!("pa".parse::<Transform>().unwrap(), Transform::PresenceAbsence);
        assert_eq!(transform_functions(), vec!["log", "rank", "pa", "norm"]);
        let err = "sqrt".parse::<Transform>().unwrap_err();
        assert!(matches!(err, PfdrError::UnknownTransform(ref name) if name == "sqrt"));
    }
}
