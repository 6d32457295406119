//! Slice sampling of log-densities.
//!
//! [`SliceSampler`] advances a Markov chain by one step; the ensemble calls
//! it repeatedly for burn-in and sampling. [`StepOutSliceSampler`] is the
//! default implementation: coordinate-wise slice updates with the
//! stepping-out and shrinkage procedures (Neal, 2003).

use parking_lot::Mutex;

use crate::bounds::{Bounds, check_dim};
use crate::error::{Error, Result};
use crate::rng_util;

/// Default cap on stepping-out expansions per side.
pub const DEFAULT_MAX_STEPS_OUT: usize = 1000;
/// Cap on shrinkage proposals before keeping the current coordinate.
const MAX_SHRINK: usize = 200;

/// Unnormalized log-density evaluated by the sampler.
pub type LogDensity<'a> = dyn FnMut(&[f64]) -> Result<f64> + 'a;

/// One transition of a slice-sampling Markov chain.
pub trait SliceSampler: Send + Sync {
    /// Returns the chain state after one step from `x`.
    ///
    /// `sigma` is the initial bracket width; `bounds`, if given, confines
    /// the chain to a box.
    ///
    /// # Errors
    ///
    /// Propagates errors from `log_density`. Returns
    /// `Error::InvalidConfig` for a non-positive `sigma` and
    /// `Error::DimensionMismatch` if `bounds` does not match `x`.
    fn step(
        &self,
        x: &[f64],
        log_density: &mut LogDensity<'_>,
        sigma: f64,
        bounds: Option<&Bounds>,
    ) -> Result<Vec<f64>>;
}

/// Coordinate-wise slice sampler with stepping out.
///
/// Each step visits the coordinates in random order. For every coordinate
/// it draws a slice level under the current density, places a bracket of
/// width `sigma` at a random offset around the point, expands it until both
/// ends leave the slice, then shrinks it towards the current value until a
/// proposal inside the slice is found.
///
/// # Examples
///
/// ```
/// use surrogate_utils::slice::{SliceSampler, StepOutSliceSampler};
///
/// let sampler = StepOutSliceSampler::with_seed(7);
/// let mut log_density = |x: &[f64]| Ok::<_, surrogate_utils::Error>(-0.5 * x[0] * x[0]);
///
/// let mut state = vec![0.0];
/// for _ in 0..10 {
///     state = sampler.step(&state, &mut log_density, 1.0, None).unwrap();
/// }
/// assert!(state[0].is_finite());
/// ```
pub struct StepOutSliceSampler {
    rng: Mutex<fastrand::Rng>,
    max_steps_out: usize,
}

impl StepOutSliceSampler {
    /// Creates a sampler with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
            max_steps_out: DEFAULT_MAX_STEPS_OUT,
        }
    }

    /// Creates a sampler with a fixed seed for reproducible chains.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            max_steps_out: DEFAULT_MAX_STEPS_OUT,
        }
    }

    /// Caps the number of bracket expansions on each side.
    ///
    /// Default: 1000.
    #[must_use]
    pub fn max_steps_out(mut self, n: usize) -> Self {
        self.max_steps_out = n;
        self
    }
}

impl Default for StepOutSliceSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates the density with coordinate `dim` set to `value`, restoring it
/// afterwards. NaN densities count as outside the slice.
fn density_at(
    log_density: &mut LogDensity<'_>,
    x: &mut [f64],
    dim: usize,
    value: f64,
) -> Result<f64> {
    let saved = x[dim];
    x[dim] = value;
    let lp = log_density(&*x);
    x[dim] = saved;
    lp.map(not_nan)
}

fn not_nan(lp: f64) -> f64 {
    if lp.is_nan() { f64::NEG_INFINITY } else { lp }
}

impl SliceSampler for StepOutSliceSampler {
    fn step(
        &self,
        x0: &[f64],
        log_density: &mut LogDensity<'_>,
        sigma: f64,
        bounds: Option<&Bounds>,
    ) -> Result<Vec<f64>> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::InvalidConfig("slice width sigma must be positive and finite"));
        }
        let mut x = x0.to_vec();
        if let Some(b) = bounds {
            check_dim(b.dim(), x.len())?;
            b.clamp(&mut x);
        }

        let mut rng = self.rng.lock();
        let mut log_px = not_nan(log_density(&x)?);

        let mut order: Vec<usize> = (0..x.len()).collect();
        rng.shuffle(&mut order);

        for dim in order {
            let (lo, hi) = bounds.map_or((f64::NEG_INFINITY, f64::INFINITY), |b| b.ranges()[dim]);
            let current = x[dim];
            let log_level = log_px + (1.0 - rng.f64()).ln();

            let offset = rng.f64();
            let mut left = (current - offset * sigma).max(lo);
            let mut right = (current + (1.0 - offset) * sigma).min(hi);

            let mut steps = 0;
            while steps < self.max_steps_out
                && left > lo
                && density_at(log_density, &mut x, dim, left)? > log_level
            {
                left = (left - sigma).max(lo);
                steps += 1;
            }
            steps = 0;
            while steps < self.max_steps_out
                && right < hi
                && density_at(log_density, &mut x, dim, right)? > log_level
            {
                right = (right + sigma).min(hi);
                steps += 1;
            }

            let mut accepted = false;
            for _ in 0..MAX_SHRINK {
                let proposal = rng_util::f64_range(&mut rng, left, right);
                x[dim] = proposal;
                let lp = not_nan(log_density(&x)?);
                if lp > log_level {
                    log_px = lp;
                    accepted = true;
                    break;
                }
                if proposal > current {
                    right = proposal;
                } else if proposal < current {
                    left = proposal;
                } else {
                    break;
                }
            }
            if !accepted {
                trace_debug!(dim, "slice bracket collapsed, keeping current coordinate");
                x[dim] = current;
            }
        }

        Ok(x)
    }
}
