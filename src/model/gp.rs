//! Gaussian Process regressor with an RBF (squared-exponential) kernel.
//!
//! The kernel uses **ARD lengthscales** and Gaussian observation noise:
//!
//! `k(x1, x2) = σ² exp(-½ Σ ((x1_i - x2_i) / l_i)²)`
//!
//! The hyperparameter vector is laid out as
//! `[σ², l_1, ..., l_d, σ_n²]`, all strictly positive. Training outputs are
//! stored mean-centred; predictions add the mean back.
//!
//! The posterior is computed by Cholesky factorization of `K + σ_n² I`.
//! If the factorization fails, increasing diagonal jitter is added before
//! giving up with [`Error::NotPositiveDefinite`].
//!
//! # Examples
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use surrogate_utils::model::{GaussianProcess, Model};
//!
//! let x = DMatrix::from_row_slice(3, 1, &[0.0, 0.5, 1.0]);
//! let y = DVector::from_vec(vec![0.0, 0.25, 1.0]);
//!
//! let gp = GaussianProcess::builder(1)
//!     .lengthscales(vec![0.5])
//!     .noise_variance(1e-6)
//!     .data(x, y)
//!     .build()
//!     .unwrap();
//!
//! let pred = gp.predict(&DMatrix::from_row_slice(1, 1, &[0.5]), false).unwrap();
//! assert!((pred.mean[0] - 0.25).abs() < 1e-3);
//! ```

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use super::{Model, ModelSnapshot, Prediction, Surrogate, Variance};
use crate::bounds::{Bounds, check_dim};
use crate::config::OptimizationConfig;
use crate::error::{Error, Result};
use crate::optimize::{MultiStartMinimizer, RestartOptimizer};

/// Default signal variance.
const DEFAULT_SIGNAL_VAR: f64 = 1.0;
/// Default lengthscale, per dimension.
const DEFAULT_LENGTHSCALE: f64 = 1.0;
/// Default observation noise variance.
const DEFAULT_NOISE_VAR: f64 = 1e-2;
/// Hyperparameter box used by maximum-likelihood fitting when the
/// configuration has none.
const DEFAULT_HP_RANGE: (f64, f64) = (1e-3, 1e3);
/// Number of jitter escalations tried before the factorization fails.
const MAX_JITTER_TRIES: usize = 5;

/// Cached posterior quantities.
#[derive(Clone, Debug)]
struct Posterior {
    cholesky: Cholesky<f64, Dyn>,
    /// α = (K + σ_n²I)^{-1} y.
    alpha: DVector<f64>,
}

/// Gaussian Process surrogate.
///
/// Built with [`GaussianProcess::builder`]. Implements [`Model`] and
/// [`Surrogate`], so it can be used on its own or wrapped in a
/// [`ModelEnsemble`](super::ModelEnsemble) when configured for slice
/// sampling.
#[derive(Clone, Debug)]
pub struct GaussianProcess {
    x: DMatrix<f64>,
    y: DVector<f64>,
    y_mean: f64,
    params: Vec<f64>,
    config: OptimizationConfig,
    seed: Option<u64>,
    posterior: Option<Posterior>,
}

impl GaussianProcess {
    /// Creates a builder for a GP over `input_dim` input dimensions.
    #[must_use]
    pub fn builder(input_dim: usize) -> GaussianProcessBuilder {
        GaussianProcessBuilder::new(input_dim)
    }

    /// Number of input dimensions.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.params.len() - 2
    }

    /// Kernel signal variance σ².
    #[must_use]
    pub fn signal_variance(&self) -> f64 {
        self.params[0]
    }

    /// Observation noise variance σ_n².
    #[must_use]
    pub fn noise_variance(&self) -> f64 {
        self.params[self.params.len() - 1]
    }

    /// Kernel matrix `k(a, b)` under `params`.
    fn kernel(a: &DMatrix<f64>, b: &DMatrix<f64>, params: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(a.nrows(), b.nrows(), |i, j| rbf(a, i, b, j, params))
    }

    fn check_inputs(&self, x: &DMatrix<f64>) -> Result<()> {
        check_dim(self.input_dim(), x.ncols())
    }
}

/// RBF kernel between row `i` of `a` and row `j` of `b`.
fn rbf(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize, params: &[f64]) -> f64 {
    let mut r_sq = 0.0;
    for k in 0..a.ncols() {
        let diff = (a[(i, k)] - b[(j, k)]) / params[1 + k];
        r_sq += diff * diff;
    }
    params[0] * (-0.5 * r_sq).exp()
}

/// Rejects wrong-length or non-positive hyperparameter vectors.
fn validate_params(params: &[f64], expected_len: usize) -> Result<()> {
    check_dim(expected_len, params.len())?;
    for (index, &value) in params.iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::InvalidParameter { index, value });
        }
    }
    Ok(())
}

/// Cholesky factor of `K + σ_n² I`, escalating jitter on failure.
fn factorize(x: &DMatrix<f64>, params: &[f64]) -> Option<Cholesky<f64, Dyn>> {
    let n = x.nrows();
    let noise = params[params.len() - 1];
    let mut k = GaussianProcess::kernel(x, x, params);
    for i in 0..n {
        k[(i, i)] += noise;
    }
    if let Some(chol) = Cholesky::new(k.clone()) {
        return Some(chol);
    }

    #[allow(clippy::cast_precision_loss)]
    let mean_diag = k.diagonal().sum() / n as f64;
    let mut jitter = mean_diag * 1e-10;
    for _ in 0..MAX_JITTER_TRIES {
        trace_debug!(jitter, "kernel matrix not positive definite, adding jitter");
        let mut kj = k.clone();
        for i in 0..n {
            kj[(i, i)] += jitter;
        }
        if let Some(chol) = Cholesky::new(kj) {
            return Some(chol);
        }
        jitter *= 10.0;
    }
    None
}

/// Posterior for centred outputs `y`, or `None` without data.
fn fit(x: &DMatrix<f64>, y: &DVector<f64>, params: &[f64]) -> Result<Option<Posterior>> {
    if x.nrows() == 0 {
        return Ok(None);
    }
    let cholesky = factorize(x, params).ok_or(Error::NotPositiveDefinite)?;
    let alpha = cholesky.solve(y);
    Ok(Some(Posterior { cholesky, alpha }))
}

impl Model for GaussianProcess {
    fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    fn y(&self) -> &DVector<f64> {
        &self.y
    }

    fn y_mean(&self) -> f64 {
        self.y_mean
    }

    #[allow(clippy::cast_precision_loss)]
    fn set_data(&mut self, x: DMatrix<f64>, y: DVector<f64>) -> Result<()> {
        self.check_inputs(&x)?;
        check_dim(x.nrows(), y.len())?;

        let y_mean = if y.is_empty() {
            0.0
        } else {
            y.sum() / y.len() as f64
        };
        let y_centred = y.add_scalar(-y_mean);
        let posterior = fit(&x, &y_centred, &self.params)?;

        self.x = x;
        self.y = y_centred;
        self.y_mean = y_mean;
        self.posterior = posterior;
        Ok(())
    }

    fn predict(&self, x_star: &DMatrix<f64>, full_cov: bool) -> Result<Prediction> {
        self.check_inputs(x_star)?;
        let m = x_star.nrows();
        let noise = self.noise_variance();

        let Some(post) = &self.posterior else {
            // no data: prior
            let mean = DVector::from_element(m, self.y_mean);
            let variance = if full_cov {
                let mut k = Self::kernel(x_star, x_star, &self.params);
                for i in 0..m {
                    k[(i, i)] += noise;
                }
                Variance::Full(k)
            } else {
                Variance::Diagonal(DVector::from_element(m, self.signal_variance() + noise))
            };
            return Ok(Prediction { mean, variance });
        };

        // n × m cross covariance
        let k_star = Self::kernel(&self.x, x_star, &self.params);
        let mean = (k_star.transpose() * &post.alpha).add_scalar(self.y_mean);
        let v = post.cholesky.solve(&k_star);

        let variance = if full_cov {
            let mut cov = Self::kernel(x_star, x_star, &self.params) - k_star.transpose() * v;
            for i in 0..m {
                cov[(i, i)] = cov[(i, i)].max(0.0) + noise;
            }
            Variance::Full(cov)
        } else {
            let sf2 = self.signal_variance();
            Variance::Diagonal(DVector::from_fn(m, |j, _| {
                let reduction = k_star.column(j).dot(&v.column(j));
                (sf2 - reduction).max(0.0) + noise
            }))
        };

        Ok(Prediction { mean, variance })
    }

    fn dmu_dx(&self, x_star: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.check_inputs(x_star)?;
        let d = self.input_dim();
        let mut grad = DMatrix::zeros(x_star.nrows(), d);
        let Some(post) = &self.posterior else {
            return Ok(grad);
        };

        // ∂μ/∂x*_k = Σ_i α_i k(x*, x_i) (x_ik - x*_k) / l_k²
        for j in 0..x_star.nrows() {
            for i in 0..self.x.nrows() {
                let weight = post.alpha[i] * rbf(x_star, j, &self.x, i, &self.params);
                for k in 0..d {
                    let l = self.params[1 + k];
                    grad[(j, k)] += weight * (self.x[(i, k)] - x_star[(j, k)]) / (l * l);
                }
            }
        }
        Ok(grad)
    }

    fn lengthscale(&self) -> &[f64] {
        &self.params[1..self.params.len() - 1]
    }

    fn optimize(&mut self) -> Result<()> {
        let OptimizationConfig::Grad(config) = &self.config else {
            return Err(Error::InvalidConfig(
                "slice sampling is run by wrapping the model in a ModelEnsemble",
            ));
        };
        if self.x.nrows() == 0 {
            return Err(Error::NoTrainingData);
        }

        let n_params = self.params.len();
        let log_bounds = match config.hp_bounds() {
            Some(b) => b.ln()?,
            None => Bounds::uniform(n_params, DEFAULT_HP_RANGE.0, DEFAULT_HP_RANGE.1)?.ln()?,
        };
        check_dim(n_params, log_bounds.dim())?;

        let minimizer = self
            .seed
            .map_or_else(MultiStartMinimizer::new, MultiStartMinimizer::with_seed);
        let objective = |log_theta: &[f64]| self.objective_log_theta(log_theta);

        let start: Vec<f64> = self.params.iter().map(|p| p.ln()).collect();
        let current = objective(&start)?;
        let local =
            minimizer.minimize_local(&objective, &start, Some(&log_bounds), config.options())?;
        let global = minimizer.minimize(
            &objective,
            &log_bounds,
            config.num_restarts(),
            config.options(),
        )?;
        let best = if global.fun < local.fun { global } else { local };

        // the current point may sit outside the box and still be better
        if current <= best.fun {
            trace_debug!(nlml = current, "kept current GP hyperparameters");
            return Ok(());
        }
        trace_info!(nlml = best.fun, converged = best.converged, "GP hyperparameters fitted");

        let params: Vec<f64> = best.x.iter().map(|v| v.exp()).collect();
        self.set_param_array(&params)
    }
}

impl Surrogate for GaussianProcess {
    fn param_array(&self) -> &[f64] {
        &self.params
    }

    fn set_param_array(&mut self, params: &[f64]) -> Result<()> {
        validate_params(params, self.params.len())?;
        let posterior = fit(&self.x, &self.y, params)?;
        self.params.copy_from_slice(params);
        self.posterior = posterior;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn objective_log_theta(&self, log_theta: &[f64]) -> Result<f64> {
        check_dim(self.params.len(), log_theta.len())?;
        let n = self.x.nrows();
        if n == 0 {
            return Ok(0.0);
        }

        let theta: Vec<f64> = log_theta.iter().map(|v| v.exp()).collect();
        if theta.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return Ok(f64::INFINITY);
        }
        let Some(chol) = factorize(&self.x, &theta) else {
            return Ok(f64::INFINITY);
        };

        let alpha = chol.solve(&self.y);
        let data_fit = 0.5 * self.y.dot(&alpha);
        let log_det_half: f64 = chol.l_dirty().diagonal().iter().map(|v| v.ln()).sum();
        let norm = 0.5 * n as f64 * (2.0 * core::f64::consts::PI).ln();
        Ok(data_fit + log_det_half + norm)
    }

    fn opt_config(&self) -> &OptimizationConfig {
        &self.config
    }

    fn set_opt_config(&mut self, config: OptimizationConfig) {
        self.config = config;
    }

    fn from_snapshot(&self, snapshot: &ModelSnapshot) -> Result<Self> {
        validate_params(&snapshot.params, self.params.len())?;
        let mut gp = Self {
            x: DMatrix::zeros(0, self.input_dim()),
            y: DVector::zeros(0),
            y_mean: 0.0,
            params: snapshot.params.clone(),
            config: snapshot.config.clone(),
            seed: self.seed,
            posterior: None,
        };
        gp.set_data(snapshot.x.clone(), snapshot.y.clone())?;
        Ok(gp)
    }
}

/// Builder for [`GaussianProcess`].
///
/// Defaults:
/// - `signal_variance`: 1.0
/// - `lengthscales`: 1.0 per dimension
/// - `noise_variance`: 1e-2
/// - `config`: pointwise ([`OptimizationConfig::Grad`]) with defaults
/// - no training data
#[derive(Clone, Debug)]
pub struct GaussianProcessBuilder {
    input_dim: usize,
    signal_variance: Option<f64>,
    lengthscales: Option<Vec<f64>>,
    noise_variance: Option<f64>,
    config: Option<OptimizationConfig>,
    data: Option<(DMatrix<f64>, DVector<f64>)>,
    seed: Option<u64>,
}

impl GaussianProcessBuilder {
    /// Creates a builder for `input_dim` input dimensions.
    #[must_use]
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            signal_variance: None,
            lengthscales: None,
            noise_variance: None,
            config: None,
            data: None,
            seed: None,
        }
    }

    /// Sets the kernel signal variance.
    #[must_use]
    pub fn signal_variance(mut self, v: f64) -> Self {
        self.signal_variance = Some(v);
        self
    }

    /// Sets the ARD lengthscales, one per input dimension.
    #[must_use]
    pub fn lengthscales(mut self, ls: Vec<f64>) -> Self {
        self.lengthscales = Some(ls);
        self
    }

    /// Sets the observation noise variance.
    #[must_use]
    pub fn noise_variance(mut self, v: f64) -> Self {
        self.noise_variance = Some(v);
        self
    }

    /// Sets how hyperparameters are obtained.
    #[must_use]
    pub fn config(mut self, config: OptimizationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the initial training data.
    #[must_use]
    pub fn data(mut self, x: DMatrix<f64>, y: DVector<f64>) -> Self {
        self.data = Some((x, y));
        self
    }

    /// Sets the random seed used by maximum-likelihood restarts.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the GP.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for zero input dimensions,
    /// `Error::DimensionMismatch` for wrong-length lengthscales or data,
    /// `Error::InvalidParameter` for non-positive hyperparameters, and
    /// `Error::NotPositiveDefinite` if the initial data cannot be fitted.
    pub fn build(self) -> Result<GaussianProcess> {
        if self.input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be at least 1"));
        }
        let lengthscales = self
            .lengthscales
            .unwrap_or_else(|| vec![DEFAULT_LENGTHSCALE; self.input_dim]);
        check_dim(self.input_dim, lengthscales.len())?;

        let mut params = Vec::with_capacity(self.input_dim + 2);
        params.push(self.signal_variance.unwrap_or(DEFAULT_SIGNAL_VAR));
        params.extend(lengthscales);
        params.push(self.noise_variance.unwrap_or(DEFAULT_NOISE_VAR));
        validate_params(&params, self.input_dim + 2)?;

        let mut gp = GaussianProcess {
            x: DMatrix::zeros(0, self.input_dim),
            y: DVector::zeros(0),
            y_mean: 0.0,
            params,
            config: self.config.unwrap_or_default(),
            seed: self.seed,
            posterior: None,
        };
        if let Some((x, y)) = self.data {
            gp.set_data(x, y)?;
        }
        Ok(gp)
    }
}
