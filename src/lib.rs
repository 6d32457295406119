#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Surrogate-model utilities for Bayesian optimization experiments:
//! Lipschitz-constant estimation of a posterior mean, hyperparameter
//! marginalization by slice sampling, and noisy observation helpers.
//!
//! # Getting Started
//!
//! Fit a Gaussian Process, then bound how fast its mean can change:
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use surrogate_utils::prelude::*;
//!
//! let x = DMatrix::from_row_slice(5, 1, &[0.0, 0.25, 0.5, 0.75, 1.0]);
//! let y = DVector::from_vec(vec![0.0, 0.7, 1.0, 0.7, 0.0]);
//! let mut gp = GaussianProcess::builder(1).data(x, y).seed(0).build().unwrap();
//! gp.optimize().unwrap();
//!
//! let bounds = Bounds::uniform(1, 0.0, 1.0).unwrap();
//! let l = estimate_lipschitz_constant(&gp, Some(&bounds)).unwrap();
//! assert!(l > 0.0);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Model`] | Predictive interface: data, posterior mean/variance, mean gradient, fitting. |
//! | [`Surrogate`] | A single model's hyperparameters, training objective and configuration. |
//! | [`GaussianProcess`] | RBF-kernel GP implementing both traits. |
//! | [`ModelEnsemble`] | Averages a slice-configured surrogate over hyperparameter samples. |
//! | [`LipschitzEstimator`] | Largest posterior-mean gradient norm over a box or from the data. |
//! | [`NoisySampler`] | Gaussian input/output noise for simulated observations. |
//! | [`ExperimentProgress`] | Mean duration and ETA of an experiment batch. |
//!
//! # Pluggable collaborators
//!
//! The minimizer and the slice sampler sit behind
//! [`RestartOptimizer`](optimize::RestartOptimizer) and
//! [`SliceSampler`](slice::SliceSampler). The defaults are
//! [`MultiStartMinimizer`](optimize::MultiStartMinimizer) and
//! [`StepOutSliceSampler`](slice::StepOutSliceSampler).
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on bounds and configuration types | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod bounds;
pub mod config;
mod error;
pub mod lipschitz;
pub mod model;
pub mod noise;
pub mod optimize;
pub mod progress;
mod rng_util;
pub mod slice;

pub use bounds::Bounds;
pub use error::{Error, Result};
pub use lipschitz::{LipschitzEstimator, estimate_lipschitz_around_x, estimate_lipschitz_constant};
pub use model::{GaussianProcess, Model, ModelEnsemble, Prediction, Surrogate, Variance};
pub use noise::{NoisySample, NoisySampler};
pub use progress::ExperimentProgress;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use surrogate_utils::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bounds::Bounds;
    pub use crate::config::{GradConfig, OptimizationConfig, SliceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::lipschitz::{
        LipschitzEstimator, estimate_lipschitz_around_x, estimate_lipschitz_constant,
    };
    pub use crate::model::{
        GaussianProcess, Model, ModelEnsemble, ModelSnapshot, Prediction, Surrogate, Variance,
    };
    pub use crate::noise::{NoisySample, NoisySampler};
    pub use crate::optimize::{MinimizeOptions, MultiStartMinimizer, RestartOptimizer};
    pub use crate::progress::ExperimentProgress;
    pub use crate::slice::{SliceSampler, StepOutSliceSampler};
}
