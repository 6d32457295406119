//! Sampling-based inference over surrogate hyperparameters.
//!
//! [`ModelEnsemble`] turns a point-estimate surrogate into an approximate
//! Bayesian model. It draws `N` hyperparameter vectors from the posterior
//! of the surrogate's training objective with a slice-sampling chain, gives
//! each of `N` member surrogates one of them, and answers predictions by
//! averaging over the members.
//!
//! # Algorithm overview
//!
//! 1. **Burn-in**: run the chain for `burn_in` steps from the log of the
//!    original model's current hyperparameters, keeping only the final
//!    state.
//! 2. **Sampling**: continue the same chain for `N` steps and record the
//!    exponentiated state after each step. Consecutive samples are
//!    correlated; there is no thinning.
//! 3. **Propagation**: row `i` of the sample matrix becomes the parameter
//!    vector of member `i`.
//!
//! After sampling, the original model holds the last chain state, so the
//! next [`optimize`](Model::optimize) call continues the chain.
//!
//! # Prediction
//!
//! [`predict`](Model::predict) returns the unweighted mean of the members'
//! predictive means and variances. The averaged variance ignores the spread
//! of member means and can understate uncertainty when samples disagree;
//! [`ModelEnsemble::predict_mixture`] adds that spread back.
//!
//! # Examples
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use surrogate_utils::config::{OptimizationConfig, SliceConfig};
//! use surrogate_utils::model::{GaussianProcess, Model, ModelEnsemble};
//! use surrogate_utils::slice::StepOutSliceSampler;
//! use surrogate_utils::Bounds;
//!
//! let x = DMatrix::from_row_slice(4, 1, &[0.0, 0.3, 0.6, 1.0]);
//! let y = DVector::from_vec(vec![0.0, 0.5, 0.9, 0.2]);
//! let config = SliceConfig::builder(3)
//!     .burn_in(5)
//!     .hp_bounds(Bounds::uniform(3, 1e-3, 10.0).unwrap())
//!     .build()
//!     .unwrap();
//! let gp = GaussianProcess::builder(1)
//!     .data(x, y)
//!     .config(OptimizationConfig::Slice(config))
//!     .build()
//!     .unwrap();
//!
//! let mut ensemble = ModelEnsemble::with_sampler(gp, StepOutSliceSampler::with_seed(1)).unwrap();
//! ensemble.optimize().unwrap();
//!
//! let pred = ensemble.predict(&DMatrix::from_row_slice(1, 1, &[0.5]), false).unwrap();
//! assert_eq!(pred.mean.len(), 1);
//! ```

use nalgebra::{DMatrix, DVector};

use super::{Model, Prediction, Surrogate, Variance};
use crate::bounds::{Bounds, check_dim};
use crate::config::{GradConfig, OptimizationConfig, SliceConfig};
use crate::error::{Error, Result};
use crate::slice::{SliceSampler, StepOutSliceSampler};

/// An original surrogate plus one member surrogate per hyperparameter sample.
///
/// The ensemble implements [`Model`], so it can stand in for a single
/// surrogate: data, lengthscale and mean-gradient queries read through to
/// the original model, while `set_data`, `predict` and `optimize` act on
/// the whole ensemble.
pub struct ModelEnsemble<M, S = StepOutSliceSampler> {
    original: M,
    members: Vec<M>,
    samples: Option<DMatrix<f64>>,
    config: SliceConfig,
    sampler: S,
}

impl<M: Surrogate> ModelEnsemble<M> {
    /// Wraps `model` using the default slice sampler with a random seed.
    ///
    /// # Errors
    ///
    /// See [`ModelEnsemble::with_sampler`].
    pub fn new(model: M) -> Result<Self> {
        Self::with_sampler(model, StepOutSliceSampler::new())
    }
}

impl<M: Surrogate, S: SliceSampler> ModelEnsemble<M, S> {
    /// Wraps `model`, which must be configured with
    /// [`OptimizationConfig::Slice`].
    ///
    /// The model's own configuration is switched to pointwise
    /// ([`OptimizationConfig::Grad`], keeping the hyperparameter bounds),
    /// so sampling is driven by the ensemble only. Members are built from
    /// a snapshot of the reconfigured model.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSamplingModel` if the model is not configured for
    /// slice sampling, and propagates errors from building the members.
    pub fn with_sampler(mut model: M, sampler: S) -> Result<Self> {
        let config = match model.opt_config() {
            OptimizationConfig::Slice(c) => c.clone(),
            other => {
                return Err(Error::NotSamplingModel {
                    method: other.method_name(),
                });
            }
        };

        let mut pointwise = GradConfig::builder();
        if let Some(b) = config.hp_bounds() {
            pointwise = pointwise.hp_bounds(b.clone());
        }
        model.set_opt_config(OptimizationConfig::Grad(pointwise.build()?));

        let snapshot = model.snapshot();
        let members = (0..config.n_samples())
            .map(|_| model.from_snapshot(&snapshot))
            .collect::<Result<Vec<_>>>()?;

        trace_info!(
            n_samples = config.n_samples(),
            burn_in = config.burn_in(),
            "model ensemble created"
        );

        Ok(Self {
            original: model,
            members,
            samples: None,
            config,
            sampler,
        })
    }

    /// The canonical model the ensemble was built from.
    #[must_use]
    pub fn original(&self) -> &M {
        &self.original
    }

    /// The member models, index-aligned with the sample rows.
    #[must_use]
    pub fn members(&self) -> &[M] {
        &self.members
    }

    /// The sampling configuration taken from the wrapped model.
    #[must_use]
    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    /// Returns `true` once hyperparameter samples have been assigned.
    #[must_use]
    pub fn is_sampled(&self) -> bool {
        self.samples.is_some()
    }

    /// The current hyperparameter samples (one row per member, natural
    /// space), or `None` before sampling.
    #[must_use]
    pub fn param_array(&self) -> Option<&DMatrix<f64>> {
        self.samples.as_ref()
    }

    /// Assigns hyperparameter samples and pushes row `i` into member `i`.
    ///
    /// The shape and positivity of `samples` are checked before any member
    /// is touched. If a member rejects its row, the members updated so far
    /// get their previous parameters back and the stored samples are left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Error::SampleCountMismatch` if the number of rows differs
    /// from the ensemble size, `Error::DimensionMismatch` for the wrong
    /// number of columns, `Error::InvalidParameter` for non-positive
    /// entries, and propagates member refit failures.
    pub fn set_param_array(&mut self, samples: DMatrix<f64>) -> Result<()> {
        if samples.nrows() != self.members.len() {
            return Err(Error::SampleCountMismatch {
                expected: self.members.len(),
                got: samples.nrows(),
            });
        }
        check_dim(self.original.param_array().len(), samples.ncols())?;
        for (index, &value) in samples.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidParameter {
                    index: index / samples.nrows(),
                    value,
                });
            }
        }

        let previous: Vec<Vec<f64>> = self
            .members
            .iter()
            .map(|m| m.param_array().to_vec())
            .collect();
        for (i, row) in samples.row_iter().enumerate() {
            let params: Vec<f64> = row.iter().copied().collect();
            if let Err(err) = self.members[i].set_param_array(&params) {
                // restore the members already updated
                for (member, old) in self.members[..i].iter_mut().zip(&previous) {
                    member.set_param_array(old)?;
                }
                return Err(err);
            }
        }
        self.samples = Some(samples);
        Ok(())
    }

    /// Alias of [`Model::set_data`].
    ///
    /// # Errors
    ///
    /// See [`Model::set_data`].
    pub fn set_xy(&mut self, x: DMatrix<f64>, y: DVector<f64>) -> Result<()> {
        self.set_data(x, y)
    }

    /// Predicts like [`Model::predict`] and also returns the Gaussian log
    /// predictive density of `y_star` under the averaged moments.
    ///
    /// Only the marginal variances enter the density, also when
    /// `full_cov` is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSampled` before sampling and
    /// `Error::DimensionMismatch` if `y_star` does not match `x_star`.
    pub fn predict_with_target(
        &self,
        x_star: &DMatrix<f64>,
        y_star: &DVector<f64>,
        full_cov: bool,
    ) -> Result<(Prediction, DVector<f64>)> {
        let prediction = self.predict(x_star, full_cov)?;
        let log_prob = prediction.log_density(y_star)?;
        Ok((prediction, log_prob))
    }

    /// Marginal moments of the equal-weight Gaussian mixture over members:
    /// the averaged variance plus the variance of the member means.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSampled` before sampling.
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_mixture(&self, x_star: &DMatrix<f64>) -> Result<Prediction> {
        let averaged = self.predict(x_star, false)?;
        let mut second_moment = DVector::zeros(x_star.nrows());
        for member in &self.members {
            let p = member.predict(x_star, false)?;
            second_moment += p.mean.component_mul(&p.mean);
        }
        second_moment /= self.members.len() as f64;

        let spread = second_moment - averaged.mean.component_mul(&averaged.mean);
        let variance = averaged.variance.diagonal() + spread.map(|v| v.max(0.0));
        Ok(Prediction {
            mean: averaged.mean,
            variance: Variance::Diagonal(variance),
        })
    }

    /// Hyperparameter bounds in log space, checked against the parameter
    /// vector length.
    fn log_bounds(&self) -> Result<Option<Bounds>> {
        let Some(b) = self.config.hp_bounds() else {
            return Ok(None);
        };
        check_dim(self.original.param_array().len(), b.dim())?;
        b.ln().map(Some)
    }
}

impl<M: Surrogate, S: SliceSampler> Model for ModelEnsemble<M, S> {
    fn x(&self) -> &DMatrix<f64> {
        self.original.x()
    }

    fn y(&self) -> &DVector<f64> {
        self.original.y()
    }

    fn y_mean(&self) -> f64 {
        self.original.y_mean()
    }

    fn set_data(&mut self, x: DMatrix<f64>, y: DVector<f64>) -> Result<()> {
        self.original.set_data(x, y)?;
        let x = self.original.x();
        let y = self.original.y().add_scalar(self.original.y_mean());
        for member in &mut self.members {
            member.set_data(x.clone(), y.clone())?;
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, x_star: &DMatrix<f64>, full_cov: bool) -> Result<Prediction> {
        let samples = self.samples.as_ref().ok_or(Error::NotSampled)?;

        let mut members = self.members.iter();
        let first = members
            .next()
            .ok_or(Error::Internal("ensemble has no members"))?;
        let mut total = first.predict(x_star, full_cov)?;
        for member in members {
            total.accumulate(&member.predict(x_star, full_cov)?)?;
        }
        total.scale(1.0 / samples.nrows() as f64);
        Ok(total)
    }

    fn dmu_dx(&self, x_star: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.original.dmu_dx(x_star)
    }

    fn lengthscale(&self) -> &[f64] {
        self.original.lengthscale()
    }

    fn optimize(&mut self) -> Result<()> {
        let log_bounds = self.log_bounds()?;
        let n_samples = self.config.n_samples();
        let burn_in = self.config.burn_in();
        let sigma = self.config.sigma();
        let n_params = self.original.param_array().len();

        let mut state: Vec<f64> = self.original.param_array().iter().map(|p| p.ln()).collect();
        let mut samples = DMatrix::zeros(n_samples, n_params);
        {
            let original = &self.original;
            let mut log_density =
                |log_theta: &[f64]| original.objective_log_theta(log_theta).map(|nlml| -nlml);

            for _ in 0..burn_in {
                state = self
                    .sampler
                    .step(&state, &mut log_density, sigma, log_bounds.as_ref())?;
            }
            trace_debug!(burn_in, "burn-in finished");

            for i in 0..n_samples {
                state = self
                    .sampler
                    .step(&state, &mut log_density, sigma, log_bounds.as_ref())?;
                for (j, v) in state.iter().enumerate() {
                    samples[(i, j)] = v.exp();
                }
                trace_debug!(sample = i, "hyperparameter sample recorded");
            }
        }

        let last: Vec<f64> = state.iter().map(|v| v.exp()).collect();
        self.original.set_param_array(&last)?;
        self.set_param_array(samples)?;

        trace_info!(n_samples, burn_in, "hyperparameter samples drawn");
        Ok(())
    }
}
