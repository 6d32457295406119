//! Lipschitz-constant estimation for a surrogate's posterior mean.
//!
//! The estimate is the largest gradient norm of the posterior mean found by
//! numerical optimization:
//!
//! `L = max_x ‖∇μ(x)‖`
//!
//! With a search box, [`LipschitzEstimator`] runs a restart-based global
//! search constrained to the box. Without one, it runs a single
//! unconstrained local search from the training input whose
//! gradient-component sum is largest. Estimates below `1e-7` (a flat or
//! constant surrogate) are replaced by a fallback of `10`.
//!
//! # Examples
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use surrogate_utils::lipschitz::LipschitzEstimator;
//! use surrogate_utils::model::GaussianProcess;
//! use surrogate_utils::Bounds;
//!
//! let x = DMatrix::from_row_slice(4, 1, &[0.0, 0.3, 0.7, 1.0]);
//! let y = DVector::from_vec(vec![0.0, 0.3, 0.7, 1.0]);
//! let gp = GaussianProcess::builder(1).data(x, y).build().unwrap();
//!
//! let estimator = LipschitzEstimator::builder().seed(3).build().unwrap();
//! let bounds = Bounds::uniform(1, 0.0, 1.0).unwrap();
//! let l = estimator.estimate(&gp, Some(&bounds)).unwrap();
//! assert!(l > 0.0);
//! ```

use nalgebra::DMatrix;

use crate::bounds::{Bounds, check_dim};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::optimize::{MinimizeOptions, MultiStartMinimizer, RestartOptimizer};

/// Default number of restarts for the bounded search.
pub const DEFAULT_NUM_RESTARTS: usize = 10;
/// Value returned when the gradient norm is numerically zero.
pub const FALLBACK_LIPSCHITZ: f64 = 10.0;
/// Estimates below this (or NaN) are replaced by [`FALLBACK_LIPSCHITZ`].
pub const MIN_LIPSCHITZ: f64 = 1e-7;

/// Estimates the Lipschitz constant of a surrogate's posterior mean.
///
/// Created via [`LipschitzEstimator::builder`]. The optimizer is pluggable
/// through [`RestartOptimizer`]; by default a [`MultiStartMinimizer`] is
/// used.
pub struct LipschitzEstimator<O = MultiStartMinimizer> {
    optimizer: O,
    num_restarts: usize,
    options: MinimizeOptions,
}

impl LipschitzEstimator {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> LipschitzEstimatorBuilder {
        LipschitzEstimatorBuilder::new()
    }
}

impl Default for LipschitzEstimator {
    fn default() -> Self {
        Self {
            optimizer: MultiStartMinimizer::new(),
            num_restarts: DEFAULT_NUM_RESTARTS,
            options: MinimizeOptions::default(),
        }
    }
}

impl<O: RestartOptimizer> LipschitzEstimator<O> {
    /// Number of restarts of the bounded search.
    #[must_use]
    pub fn num_restarts(&self) -> usize {
        self.num_restarts
    }

    /// Options passed to every local minimization.
    #[must_use]
    pub fn options(&self) -> &MinimizeOptions {
        &self.options
    }

    /// Estimates `max ‖∇μ(x)‖`, over `bounds` if given, otherwise by one
    /// local search from the steepest training point.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `bounds` does not match the
    /// surrogate's input dimension, `Error::NoTrainingData` for an
    /// unbounded search on a model without data, and propagates gradient
    /// errors from the surrogate.
    pub fn estimate<M: Model + ?Sized>(
        &self,
        surrogate: &M,
        bounds: Option<&Bounds>,
    ) -> Result<f64> {
        let objective = |x: &[f64]| -> Result<f64> {
            let point = DMatrix::from_row_slice(1, x.len(), x);
            Ok(-surrogate.dmu_dx(&point)?.norm())
        };

        let res = match bounds {
            Some(b) => {
                check_dim(surrogate.x().ncols(), b.dim())?;
                self.optimizer
                    .minimize(&objective, b, self.num_restarts, &self.options)?
            }
            None => {
                let x0 = steepest_training_point(surrogate)?;
                self.optimizer
                    .minimize_local(&objective, &x0, None, &self.options)?
            }
        };

        if !res.converged {
            trace_debug!(iterations = res.iterations, "gradient-norm search did not converge");
        }

        let lipschitz = -res.fun;
        if lipschitz.is_nan() || lipschitz < MIN_LIPSCHITZ {
            trace_info!(
                estimate = lipschitz,
                fallback = FALLBACK_LIPSCHITZ,
                "Lipschitz estimate too small, using fallback"
            );
            return Ok(FALLBACK_LIPSCHITZ);
        }
        Ok(lipschitz)
    }

    /// Estimates the Lipschitz constant in a neighbourhood of `x`: the box
    /// `[x - l, x + l]` (with `l` the surrogate's lengthscales) intersected
    /// with `bounds`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `x`, the lengthscales and
    /// `bounds` disagree on the dimension, and propagates errors from
    /// [`estimate`](Self::estimate).
    pub fn estimate_around<M: Model + ?Sized>(
        &self,
        x: &[f64],
        surrogate: &M,
        bounds: &Bounds,
    ) -> Result<f64> {
        check_dim(bounds.dim(), surrogate.lengthscale().len())?;
        let local = bounds.around(x, surrogate.lengthscale())?;
        self.estimate(surrogate, Some(&local))
    }
}

/// Training row with the largest sum of mean-gradient components.
fn steepest_training_point<M: Model + ?Sized>(surrogate: &M) -> Result<Vec<f64>> {
    let x = surrogate.x();
    if x.nrows() == 0 {
        return Err(Error::NoTrainingData);
    }
    let grad = surrogate.dmu_dx(x)?;
    let best = (0..grad.nrows())
        .map(|i| (i, grad.row(i).sum()))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i);
    Ok(x.row(best).iter().copied().collect())
}

/// Builder for [`LipschitzEstimator`].
pub struct LipschitzEstimatorBuilder<O = MultiStartMinimizer> {
    optimizer: O,
    num_restarts: usize,
    options: MinimizeOptions,
}

impl LipschitzEstimatorBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            optimizer: MultiStartMinimizer::new(),
            num_restarts: DEFAULT_NUM_RESTARTS,
            options: MinimizeOptions::default(),
        }
    }

    /// Seeds the default optimizer for reproducible restarts.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.optimizer = MultiStartMinimizer::with_seed(seed);
        self
    }
}

impl Default for LipschitzEstimatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: RestartOptimizer> LipschitzEstimatorBuilder<O> {
    /// Sets the number of restarts of the bounded search.
    ///
    /// Default: 10.
    #[must_use]
    pub fn num_restarts(mut self, n: usize) -> Self {
        self.num_restarts = n;
        self
    }

    /// Sets the iteration cap of each local minimization.
    ///
    /// Default: 200.
    #[must_use]
    pub fn max_iter(mut self, n: usize) -> Self {
        self.options.max_iter = n;
        self
    }

    /// Sets the convergence tolerance of each local minimization.
    #[must_use]
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    /// Replaces all local minimization options.
    #[must_use]
    pub fn options(mut self, options: MinimizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses a custom optimizer.
    #[must_use]
    pub fn optimizer<P: RestartOptimizer>(self, optimizer: P) -> LipschitzEstimatorBuilder<P> {
        LipschitzEstimatorBuilder {
            optimizer,
            num_restarts: self.num_restarts,
            options: self.options,
        }
    }

    /// Builds the estimator.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `num_restarts` or `max_iter` is
    /// zero, or the tolerance is not positive.
    pub fn build(self) -> Result<LipschitzEstimator<O>> {
        if self.num_restarts == 0 {
            return Err(Error::InvalidConfig("num_restarts must be at least 1"));
        }
        if self.options.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be at least 1"));
        }
        if !(self.options.tolerance.is_finite() && self.options.tolerance > 0.0) {
            return Err(Error::InvalidConfig("tolerance must be positive and finite"));
        }
        Ok(LipschitzEstimator {
            optimizer: self.optimizer,
            num_restarts: self.num_restarts,
            options: self.options,
        })
    }
}

/// Estimates the Lipschitz constant of `surrogate` with default settings.
///
/// # Errors
///
/// See [`LipschitzEstimator::estimate`].
pub fn estimate_lipschitz_constant<M: Model + ?Sized>(
    surrogate: &M,
    bounds: Option<&Bounds>,
) -> Result<f64> {
    LipschitzEstimator::default().estimate(surrogate, bounds)
}

/// Estimates the Lipschitz constant around `x` with default settings.
///
/// # Errors
///
/// See [`LipschitzEstimator::estimate_around`].
pub fn estimate_lipschitz_around_x<M: Model + ?Sized>(
    x: &[f64],
    surrogate: &M,
    bounds: &Bounds,
) -> Result<f64> {
    LipschitzEstimator::default().estimate_around(x, surrogate, bounds)
}
