use thiserror::Error;

/// Errors surfaced by the permutation FDR pipeline.
///
/// Every variant is terminal for the call that produced it.
#[derive(Debug, Error)]
pub enum PfdrError {
    #[error("unknown transform '{0}', expected one of: log, rank, pa, norm")]
    UnknownTransform(String),

    #[error("'{0}' is neither a built-in test statistic nor a registered custom statistic")]
    InvalidTestStatistic(String),

    #[error("dimension mismatch for {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid labels: {0}")]
    InvalidLabels(String),

    #[error("alpha must lie in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("permutation count must be at least 1")]
    InvalidPermutationCount,

    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PfdrError>;
