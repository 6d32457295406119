#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds: low must be positive for log scale")]
    InvalidLogBounds,

    /// Returned when two inputs disagree on their dimensionality.
    #[error("dimension mismatch: expected {expected} but got {got}")]
    DimensionMismatch {
        /// The expected size.
        expected: usize,
        /// The actual size.
        got: usize,
    },

    /// Returned when an ensemble is built around a model that is not
    /// configured for slice sampling.
    #[error("model is configured for '{method}' optimization, expected 'slice'")]
    NotSamplingModel {
        /// The optimization method the model declared.
        method: &'static str,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Returned when an ensemble is queried before any hyperparameter
    /// samples were assigned.
    #[error("ensemble has no hyperparameter samples; call optimize() first")]
    NotSampled,

    /// Returned when a sample matrix does not have one row per ensemble member.
    #[error("sample count mismatch: ensemble has {expected} members but got {got} samples")]
    SampleCountMismatch {
        /// The ensemble size.
        expected: usize,
        /// The number of sample rows provided.
        got: usize,
    },

    /// Returned when an operation needs training data but the model has none.
    #[error("model has no training data")]
    NoTrainingData,

    /// Returned when a hyperparameter that must be strictly positive is not.
    #[error("invalid hyperparameter at index {index}: {value} must be positive and finite")]
    InvalidParameter {
        /// Position in the parameter vector.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Returned when the kernel matrix stays indefinite after adding jitter.
    #[error("kernel matrix is not positive definite")]
    NotPositiveDefinite,

    /// Returned when a noise standard deviation is negative or not finite.
    #[error("invalid noise level: {0} must be finite and non-negative")]
    InvalidNoise(f64),

    /// Returned when an ETA is requested before any experiment finished.
    #[error("no completed experiments to estimate durations from")]
    NoCompletedExperiments,

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
