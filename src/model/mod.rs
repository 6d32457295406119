//! Surrogate model interfaces.
//!
//! Two traits describe what the rest of the crate needs from a regressor:
//!
//! - [`Model`] is the predictive interface shared by single surrogates and
//!   by [`ModelEnsemble`]: training data, prediction, mean gradients, and
//!   a fitting entry point.
//! - [`Surrogate`] adds the single-model hyperparameter interface: the
//!   parameter vector, the training objective in log space, the
//!   optimization configuration, and a factory that builds a fresh instance
//!   from a [`ModelSnapshot`].

pub mod ensemble;
pub mod gp;

use nalgebra::{DMatrix, DVector};

pub use self::ensemble::ModelEnsemble;
pub use self::gp::{GaussianProcess, GaussianProcessBuilder};
use crate::config::OptimizationConfig;
use crate::error::{Error, Result};

/// Predictive variance, either per point or as a full covariance matrix.
#[derive(Clone, Debug, PartialEq)]
pub enum Variance {
    /// Marginal variance of each query point.
    Diagonal(DVector<f64>),
    /// Joint covariance of the query points.
    Full(DMatrix<f64>),
}

impl Variance {
    /// Marginal variances, whichever form is stored.
    #[must_use]
    pub fn diagonal(&self) -> DVector<f64> {
        match self {
            Self::Diagonal(v) => v.clone(),
            Self::Full(m) => m.diagonal(),
        }
    }

    /// Returns `true` for the full-covariance form.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    fn add_assign(&mut self, other: &Self) -> Result<()> {
        match (self, other) {
            (Self::Diagonal(a), Self::Diagonal(b)) if a.len() == b.len() => *a += b,
            (Self::Full(a), Self::Full(b)) if a.shape() == b.shape() => *a += b,
            (Self::Diagonal(a), Self::Diagonal(b)) => {
                return Err(Error::DimensionMismatch {
                    expected: a.len(),
                    got: b.len(),
                });
            }
            (Self::Full(a), Self::Full(b)) => {
                return Err(Error::DimensionMismatch {
                    expected: a.nrows(),
                    got: b.nrows(),
                });
            }
            _ => return Err(Error::Internal("mixed diagonal and full variances")),
        }
        Ok(())
    }

    fn scale(&mut self, factor: f64) {
        match self {
            Self::Diagonal(v) => *v *= factor,
            Self::Full(m) => *m *= factor,
        }
    }
}

/// Posterior predictive moments at a batch of query points.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Predictive mean, one entry per query point.
    pub mean: DVector<f64>,
    /// Predictive variance.
    pub variance: Variance,
}

impl Prediction {
    /// Gaussian log predictive density of `y_star` under these moments,
    /// using the marginal variances only.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `y_star` does not have one
    /// entry per query point.
    pub fn log_density(&self, y_star: &DVector<f64>) -> Result<DVector<f64>> {
        crate::bounds::check_dim(self.mean.len(), y_star.len())?;
        let var = self.variance.diagonal();
        let ln_2pi = (2.0 * core::f64::consts::PI).ln();
        Ok(DVector::from_fn(y_star.len(), |i, _| {
            -0.5 * (ln_2pi + var[i].ln() + (y_star[i] - self.mean[i]).powi(2) / var[i])
        }))
    }

    /// Elementwise running sum used when averaging over an ensemble.
    pub(crate) fn accumulate(&mut self, other: &Self) -> Result<()> {
        crate::bounds::check_dim(self.mean.len(), other.mean.len())?;
        self.mean += &other.mean;
        self.variance.add_assign(&other.variance)
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        self.mean *= factor;
        self.variance.scale(factor);
    }
}

/// Immutable copy of the state a surrogate needs to be rebuilt.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSnapshot {
    /// Training inputs, one row per observation.
    pub x: DMatrix<f64>,
    /// Training outputs in the caller's units (not centred).
    pub y: DVector<f64>,
    /// Hyperparameters, natural space.
    pub params: Vec<f64>,
    /// Optimization configuration.
    pub config: OptimizationConfig,
}

/// Predictive interface shared by single surrogates and ensembles.
pub trait Model {
    /// Training inputs, one row per observation.
    fn x(&self) -> &DMatrix<f64>;

    /// Training outputs with the stored output mean subtracted.
    fn y(&self) -> &DVector<f64>;

    /// Output mean removed from the training outputs.
    fn y_mean(&self) -> f64;

    /// Replaces the training data. `y` is given in the caller's units; the
    /// model stores it mean-centred.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `x` and `y` disagree on the
    /// number of observations or `x` has the wrong number of columns.
    fn set_data(&mut self, x: DMatrix<f64>, y: DVector<f64>) -> Result<()>;

    /// Posterior predictive mean and variance at the rows of `x_star`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot produce a posterior.
    fn predict(&self, x_star: &DMatrix<f64>, full_cov: bool) -> Result<Prediction>;

    /// Gradient of the posterior mean at each row of `x_star` (one row per
    /// query point, one column per input dimension).
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot produce a posterior.
    fn dmu_dx(&self, x_star: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Per-dimension kernel lengthscales.
    fn lengthscale(&self) -> &[f64];

    /// Fits the hyperparameters according to the model's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn optimize(&mut self) -> Result<()>;
}

/// Single-model hyperparameter interface.
pub trait Surrogate: Model + Sized {
    /// Hyperparameters, natural space.
    fn param_array(&self) -> &[f64];

    /// Sets the hyperparameters and refreshes the posterior.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` for a wrong-length vector and
    /// `Error::InvalidParameter` for non-positive entries.
    fn set_param_array(&mut self, params: &[f64]) -> Result<()>;

    /// Training objective (negative log marginal likelihood) at
    /// `exp(log_theta)`. Does not change the model.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` for a wrong-length vector.
    fn objective_log_theta(&self, log_theta: &[f64]) -> Result<f64>;

    /// How the model obtains its hyperparameters.
    fn opt_config(&self) -> &OptimizationConfig;

    /// Replaces the optimization configuration.
    fn set_opt_config(&mut self, config: OptimizationConfig);

    /// Builds a new, independent instance with this model's kernel settings
    /// from `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is inconsistent with this model.
    fn from_snapshot(&self, snapshot: &ModelSnapshot) -> Result<Self>;

    /// Captures the data, hyperparameters and configuration of this model.
    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            x: self.x().clone(),
            y: self.y().add_scalar(self.y_mean()),
            params: self.param_array().to_vec(),
            config: self.opt_config().clone(),
        }
    }
}
