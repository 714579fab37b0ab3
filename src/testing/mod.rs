use crate::error::{PfdrError, Result};
use crate::testing::correction::{FdrPoint, RankedStatistics, ThresholdOutcome};
use crate::testing::statistic::TestStatistic;
use crate::transform::Transform;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub mod correction;
pub mod permutation;
pub mod statistic;

pub mod utils;

/// Direction of the threshold scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Scan ranks upwards and keep the first threshold meeting the target level.
    #[default]
    Ascending,
    /// Scan ranks downwards and stop at the first threshold violating the target level.
    Descending,
}

impl SearchMode {
    pub fn from_fdrbefast(fdrbefast: bool) -> Self {
        if fdrbefast {
            SearchMode::Descending
        } else {
            SearchMode::Ascending
        }
    }
}

#[derive(Debug, Clone)]
pub struct PfdrConfig {
    /// Statistic scored per feature
    pub statistic: TestStatistic,
    /// Transform applied to the matrix before scoring
    pub transform: Transform,
    /// Target false discovery rate, in (0, 1)
    pub alpha: f64,
    /// Number of label permutations, at least 1
    pub permutations: usize,
    /// Threshold scan direction; `Descending` is the early-stopping `fdrbefast` scan
    pub search: SearchMode,
    /// Seed for the permutation generator; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for PfdrConfig {
    fn default() -> Self {
        PfdrConfig {
            statistic: TestStatistic::MeanDiff,
            transform: Transform::Log,
            alpha: 0.05,
            permutations: 1000,
            search: SearchMode::Ascending,
            seed: None,
        }
    }
}

impl PfdrConfig {
    pub fn new(statistic: TestStatistic, transform: Transform) -> Self {
        PfdrConfig {
            statistic,
            transform,
            ..Default::default()
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_permutations(mut self, permutations: usize) -> Self {
        self.permutations = permutations;
        self
    }

    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(PfdrError::InvalidAlpha(self.alpha));
        }
        if self.permutations == 0 {
            return Err(PfdrError::InvalidPermutationCount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PfdrResult {
    /// Whether the null hypothesis is rejected for each feature
    pub reject: Vec<bool>,
    /// Rank cutoff that produced the rejections, if any threshold met the target level
    pub threshold: Option<usize>,
    /// Rank of each observed statistic among its permutation null, in `1..=permutations + 1`
    pub observed_ranks: Array1<usize>,
    /// Estimated FDR at every threshold visited by the scan
    pub fdr_curve: Vec<FdrPoint>,
}

impl PfdrResult {
    fn new(ranked: RankedStatistics, outcome: ThresholdOutcome) -> Self {
        PfdrResult {
            reject: outcome.reject(ranked.observed.view()),
            threshold: outcome.cutoff,
            observed_ranks: ranked.observed,
            fdr_curve: outcome.curve,
        }
    }

    /// Get indices of rejected features
    pub fn rejected_indices(&self) -> Vec<usize> {
        self.reject
            .iter()
            .enumerate()
            .filter_map(|(i, &r)| if r { Some(i) } else { None })
            .collect()
    }

    pub fn num_rejected(&self) -> usize {
        self.reject.iter().filter(|&&r| r).count()
    }
}

/// Runs the full permutation FDR pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct PermutationFdr {
    config: PfdrConfig,
}

impl PermutationFdr {
    pub fn new(config: PfdrConfig) -> Result<Self> {
        config.validate()?;
        Ok(PermutationFdr { config })
    }

    pub fn config(&self) -> &PfdrConfig {
        &self.config
    }

    /// Run with a generator seeded from the configuration, or from the OS when unseeded.
    pub fn run(&self, data: Array2<f64>, labels: ArrayView1<f64>) -> Result<PfdrResult> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.run_with_rng(data, labels, &mut rng)
    }

    /// Run the pipeline drawing every permutation from `rng`.
    ///
    /// `data` is consumed and transformed in place.
    pub fn run_with_rng<R>(
        &self,
        mut data: Array2<f64>,
        labels: ArrayView1<f64>,
        rng: &mut R,
    ) -> Result<PfdrResult>
    where
        R: Rng + ?Sized,
    {
        let config = &self.config;
        if labels.len() != data.ncols() {
            return Err(PfdrError::DimensionMismatch {
                context: "labels vs matrix samples",
                expected: data.ncols(),
                found: labels.len(),
            });
        }
        config.statistic.validate_labels(labels)?;

        config.transform.apply(&mut data);

        let mut dist = permutation::permute(
            data.view(),
            labels,
            &config.statistic,
            config.permutations,
            rng,
        )?;

        let replaced = dist.sanitize();
        if replaced > 0 {
            log::warn!(
                "replaced {} non-finite '{}' statistics with 0",
                replaced,
                config.statistic
            );
        }

        log::debug!("correcting floating point ties");
        correction::tie_correct(&mut dist);

        log::debug!("rank transforming {} features", dist.observed.len());
        let ranked = correction::rank_transform(&dist);

        log::debug!("scanning thresholds ({:?})", config.search);
        let outcome = match config.search {
            SearchMode::Ascending => correction::search_ascending(&ranked, config.alpha),
            SearchMode::Descending => correction::search_descending(&ranked, config.alpha),
        };

        let result = PfdrResult::new(ranked, outcome);
        log::info!(
            "{} of {} features rejected at alpha {}",
            result.num_rejected(),
            result.reject.len(),
            config.alpha
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_config_defaults() {
        let config = PfdrConfig::default();
        assert_eq!(config.statistic.name(), "meandiff");
        assert_eq!(config.transform, Transform::Log);
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.permutations, 1000);
        assert_eq!(config.search, SearchMode::Ascending);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            PermutationFdr::new(PfdrConfig::default().with_alpha(0.0)),
            Err(PfdrError::InvalidAlpha(_))
        ));
        assert!(matches!(
            PermutationFdr::new(PfdrConfig::default().with_alpha(1.0)),
            Err(PfdrError::InvalidAlpha(_))
        ));
        assert!(matches!(
            PermutationFdr::new(PfdrConfig::default().with_alpha(f64::NAN)),
            Err(PfdrError::InvalidAlpha(_))
        ));
        assert!(matches!(
            PermutationFdr::new(PfdrConfig::default().with_permutations(0)),
            Err(PfdrError::InvalidPermutationCount)
        ));
    }

    #[test]
    fn test_search_mode_flag() {
        assert_eq!(SearchMode::from_fdrbefast(true), SearchMode::Descending);
        assert_eq!(SearchMode::from_fdrbefast(false), SearchMode::Ascending);
    }

    #[test]
    fn test_dimension_mismatch_before_compute() {
        let runner = PermutationFdr::new(PfdrConfig::default().with_seed(1)).unwrap();
        let data = array![[1.0, 2.0, 3.0]];
        let err = runner.run(data, array![0.0, 1.0].view()).unwrap_err();
        assert!(matches!(
            err,
            PfdrError::DimensionMismatch { expected: 3, found: 2, .. }
        ));
    }

    #[test]
    fn test_result_helpers() {
        let result = PfdrResult {
            reject: vec![true, false, true],
            threshold: Some(4),
            observed_ranks: array![4, 1, 5],
            fdr_curve: Vec::new(),
        };
        assert_eq!(result.rejected_indices(), vec![0, 2]);
        assert_eq!(result.num_rejected(), 2);
    }
}
