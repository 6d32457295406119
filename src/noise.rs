//! Noisy observations for simulated experiments.
//!
//! [`NoisySampler`] perturbs query inputs with Gaussian noise and,
//! optionally, evaluates a test function at the clean and perturbed inputs
//! and adds Gaussian output noise.

use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;

use crate::bounds::check_dim;
use crate::error::{Error, Result};
use crate::rng_util;

/// Function-derived part of a [`NoisySample`].
#[derive(Clone, Debug, PartialEq)]
pub struct NoisyOutputs {
    /// `f(x)` at the clean inputs.
    pub f_of_x: DVector<f64>,
    /// `f(x_sample)` at the perturbed inputs.
    pub f_of_x_sample: DVector<f64>,
    /// Output noise added to `f_of_x_sample`.
    pub delta_y: DVector<f64>,
    /// Observed outputs, `f_of_x_sample + delta_y`.
    pub f_sample: DVector<f64>,
}

/// One batch of noisy observations.
#[derive(Clone, Debug, PartialEq)]
pub struct NoisySample {
    /// Perturbed inputs, `x + delta_x`.
    pub x_sample: DMatrix<f64>,
    /// Input noise.
    pub delta_x: DMatrix<f64>,
    /// Present only when a function was supplied.
    pub outputs: Option<NoisyOutputs>,
}

impl NoisySample {
    /// Observed outputs, if a function was supplied.
    #[must_use]
    pub fn f_sample(&self) -> Option<&DVector<f64>> {
        self.outputs.as_ref().map(|o| &o.f_sample)
    }

    /// Noise-free outputs at the clean inputs, if a function was supplied.
    #[must_use]
    pub fn f_of_x(&self) -> Option<&DVector<f64>> {
        self.outputs.as_ref().map(|o| &o.f_of_x)
    }
}

/// Draws noisy samples with Gaussian input and output noise.
///
/// # Examples
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use surrogate_utils::noise::NoisySampler;
///
/// let sampler = NoisySampler::with_seed(0);
/// let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
/// let f = |x: &DMatrix<f64>| DVector::from_fn(x.nrows(), |i, _| x[(i, 0)] * 2.0);
///
/// let sample = sampler.request(&x, f, 0.0, 0.0).unwrap();
/// assert_eq!(sample.x_sample, x);
/// assert_eq!(sample.f_sample().unwrap(), &DVector::from_vec(vec![0.0, 2.0]));
/// ```
pub struct NoisySampler {
    rng: Mutex<fastrand::Rng>,
}

impl NoisySampler {
    /// Creates a sampler with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a sampler with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    /// Perturbs `x` with noise of standard deviation `sigma_x`; no function
    /// is evaluated.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNoise` if `sigma_x` is negative or not finite.
    pub fn request_inputs(&self, x: &DMatrix<f64>, sigma_x: f64) -> Result<NoisySample> {
        check_sigma(sigma_x)?;
        let delta_x = {
            let mut rng = self.rng.lock();
            DMatrix::from_fn(x.nrows(), x.ncols(), |_, _| {
                rng_util::standard_normal(&mut rng) * sigma_x
            })
        };
        Ok(NoisySample {
            x_sample: x + &delta_x,
            delta_x,
            outputs: None,
        })
    }

    /// Perturbs `x`, evaluates `f` at the clean and perturbed inputs, and
    /// adds output noise of standard deviation `sigma_y`.
    ///
    /// `f` maps an `n × d` input matrix to `n` outputs.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNoise` for a negative or non-finite sigma and
    /// `Error::DimensionMismatch` if `f` does not return one value per row.
    pub fn request<F>(
        &self,
        x: &DMatrix<f64>,
        f: F,
        sigma_x: f64,
        sigma_y: f64,
    ) -> Result<NoisySample>
    where
        F: Fn(&DMatrix<f64>) -> DVector<f64>,
    {
        check_sigma(sigma_y)?;
        let mut sample = self.request_inputs(x, sigma_x)?;

        let f_of_x = f(x);
        check_dim(x.nrows(), f_of_x.len())?;
        let f_of_x_sample = f(&sample.x_sample);
        check_dim(x.nrows(), f_of_x_sample.len())?;

        let delta_y = {
            let mut rng = self.rng.lock();
            DVector::from_fn(f_of_x_sample.len(), |_, _| {
                rng_util::standard_normal(&mut rng) * sigma_y
            })
        };
        let f_sample = &f_of_x_sample + &delta_y;

        sample.outputs = Some(NoisyOutputs {
            f_of_x,
            f_of_x_sample,
            delta_y,
            f_sample,
        });
        Ok(sample)
    }
}

impl Default for NoisySampler {
    fn default() -> Self {
        Self::new()
    }
}

fn check_sigma(sigma: f64) -> Result<()> {
    if sigma.is_finite() && sigma >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidNoise(sigma))
    }
}
