//! Per-feature test statistics.
//!
//! Every statistic maps `(matrix, labels)` to one value per feature (matrix
//! row), oriented so that a larger value is stronger evidence against the
//! null hypothesis of no association with the labels.

use crate::error::{PfdrError, Result};
use crate::testing::utils::{multi_group_indices, two_group_indices};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod correlation;
pub mod nonparametric;
pub mod parametric;

/// Signature of a user-supplied statistic.
pub type StatisticFn =
    dyn Fn(ArrayView2<f64>, ArrayView1<f64>) -> anyhow::Result<Array1<f64>> + Send + Sync;

/// A named, user-supplied statistic.
#[derive(Clone)]
pub struct CustomStatistic {
    name: String,
    func: Arc<StatisticFn>,
}

impl CustomStatistic {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(ArrayView2<f64>, ArrayView1<f64>) -> anyhow::Result<Array1<f64>>
            + Send
            + Sync
            + 'static,
    {
        CustomStatistic {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStatistic")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum TestStatistic {
    MeanDiff,
    StdMeanDiff,
    MannWhitney,
    KruskalWallis,
    Spearman,
    Pearson,
    NonZeroSpearman,
    NonZeroPearson,
    Custom(CustomStatistic),
}

const BUILTIN: [TestStatistic; 8] = [
    TestStatistic::MeanDiff,
    TestStatistic::MannWhitney,
    TestStatistic::KruskalWallis,
    TestStatistic::StdMeanDiff,
    TestStatistic::Spearman,
    TestStatistic::Pearson,
    TestStatistic::NonZeroSpearman,
    TestStatistic::NonZeroPearson,
];

impl TestStatistic {
    /// Look up a built-in statistic by its registry name.
    pub fn builtin(name: &str) -> Option<TestStatistic> {
        BUILTIN.into_iter().find(|s| s.name() == name)
    }

    /// Registry name of a built-in statistic; `None` for custom statistics.
    pub fn builtin_name(&self) -> Option<&'static str> {
        let name = match self {
            TestStatistic::MeanDiff => "meandiff",
            TestStatistic::StdMeanDiff => "stdmeandiff",
            TestStatistic::MannWhitney => "mannwhitney",
            TestStatistic::KruskalWallis => "kruwallis",
            TestStatistic::Spearman => "spearman",
            TestStatistic::Pearson => "pearson",
            TestStatistic::NonZeroSpearman => "nonzerospearman",
            TestStatistic::NonZeroPearson => "nonzeropearson",
            TestStatistic::Custom(_) => return None,
        };
        Some(name)
    }

    pub fn name(&self) -> &str {
        match self {
            TestStatistic::Custom(custom) => custom.name(),
            builtin => builtin.builtin_name().unwrap_or_default(),
        }
    }

    /// Check that `labels` fit this statistic's label domain.
    ///
    /// Correlation statistics and custom statistics accept any finite labels.
    pub fn validate_labels(&self, labels: ArrayView1<f64>) -> Result<()> {
        match self {
            TestStatistic::MeanDiff | TestStatistic::MannWhitney => {
                two_group_indices(labels, 1).map(|_| ())
            }
            TestStatistic::StdMeanDiff => two_group_indices(labels, 2).map(|_| ()),
            TestStatistic::KruskalWallis => multi_group_indices(labels).map(|_| ()),
            _ => match labels.iter().position(|l| !l.is_finite()) {
                Some(i) => Err(PfdrError::InvalidLabels(format!(
                    "label at index {} is not finite",
                    i
                ))),
                None => Ok(()),
            },
        }
    }

    /// Compute one statistic value per feature.
    pub fn compute(&self, data: ArrayView2<f64>, labels: ArrayView1<f64>) -> Result<Array1<f64>> {
        if labels.len() != data.ncols() {
            return Err(PfdrError::DimensionMismatch {
                context: "labels vs matrix samples",
                expected: data.ncols(),
                found: labels.len(),
            });
        }

        let stats = match self {
            TestStatistic::MeanDiff => parametric::mean_diff(data, labels)?,
            TestStatistic::StdMeanDiff => parametric::std_mean_diff(data, labels)?,
            TestStatistic::MannWhitney => nonparametric::mann_whitney_matrix(data, labels)?,
            TestStatistic::KruskalWallis => nonparametric::kruskal_wallis_matrix(data, labels)?,
            TestStatistic::Spearman => correlation::correlation(data, labels, true),
            TestStatistic::Pearson => correlation::correlation(data, labels, false),
            TestStatistic::NonZeroSpearman => correlation::nonzero_correlation(data, labels, true),
            TestStatistic::NonZeroPearson => correlation::nonzero_correlation(data, labels, false),
            TestStatistic::Custom(custom) => (custom.func)(data, labels)?,
        };

        if stats.len() != data.nrows() {
            return Err(PfdrError::DimensionMismatch {
                context: "statistic output vs matrix features",
                expected: data.nrows(),
                found: stats.len(),
            });
        }
        Ok(stats)
    }
}

impl fmt::Display for TestStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of every built-in statistic.
pub fn statistical_tests() -> Vec<&'static str> {
    BUILTIN.iter().filter_map(TestStatistic::builtin_name).collect()
}

/// Resolves statistic names to built-ins or registered custom statistics.
#[derive(Debug, Clone, Default)]
pub struct StatisticRegistry {
    custom: HashMap<String, CustomStatistic>,
}

impl StatisticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom statistic under its name. Built-in names cannot be shadowed.
    pub fn register(&mut self, statistic: CustomStatistic) -> Result<()> {
        if TestStatistic::builtin(statistic.name()).is_some() {
            return Err(PfdrError::InvalidTestStatistic(format!(
                "{} (shadows a built-in statistic)",
                statistic.name()
            )));
        }
        self.custom.insert(statistic.name().to_string(), statistic);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<TestStatistic> {
        if let Some(statistic) = TestStatistic::builtin(name) {
            return Ok(statistic);
        }
        self.custom
            .get(name)
            .cloned()
            .map(TestStatistic::Custom)
            .ok_or_else(|| PfdrError::InvalidTestStatistic(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_builtin_names_round_trip() {
        for name in statistical_tests() {
            assert_eq!(TestStatistic::builtin(name).unwrap().name(), name);
        }
        assert!(TestStatistic::builtin("mannwhiteny").is_none());
    }

    #[test]
    fn test_listing_follows_builtin_table() {
        let names: Vec<&str> = BUILTIN.iter().map(TestStatistic::name).collect();
        assert_eq!(statistical_tests(), names);
        assert_eq!(statistical_tests()[0], "meandiff");
        assert_eq!(statistical_tests()[1], "mannwhitney");

        let custom = TestStatistic::Custom(CustomStatistic::new("rowsum", |data, _| {
            Ok(data.sum_axis(ndarray::Axis(1)))
        }));
        assert_eq!(custom.builtin_name(), None);
        assert_eq!(custom.name(), "rowsum");
    }

    #[test]
    fn test_registry_resolves_custom() {
        let mut registry = StatisticRegistry::new();
        registry
            .register(CustomStatistic::new("rowsum", |data, _labels| {
                Ok(data.sum_axis(ndarray::Axis(1)))
            }))
            .unwrap();

        let statistic = registry.resolve("rowsum").unwrap();
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let stats = statistic.compute(data.view(), array![0.0, 1.0].view()).unwrap();
        assert_eq!(stats, array![3.0, 7.0]);

        assert!(matches!(
            registry.resolve("nope"),
            Err(PfdrError::InvalidTestStatistic(_))
        ));
    }

    #[test]
    fn test_registry_rejects_builtin_shadowing() {
        let mut registry = StatisticRegistry::new();
        let result = registry.register(CustomStatistic::new("meandiff", |data, _| {
            Ok(Array1::zeros(data.nrows()))
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_output_length_checked() {
        let statistic = TestStatistic::Custom(CustomStatistic::new("short", |_, _| {
            Ok(array![1.0])
        }));
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let err = statistic
            .compute(data.view(), array![0.0, 1.0].view())
            .unwrap_err();
        assert!(matches!(
            err,
            PfdrError::DimensionMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_label_length_checked() {
        let data = array![[1.0, 2.0, 3.0]];
        let err = TestStatistic::MeanDiff
            .compute(data.view(), array![0.0, 1.0].view())
            .unwrap_err();
        assert!(matches!(err, PfdrError::DimensionMismatch { .. }));
    }
}
