//! Multi-start projected gradient descent.

use parking_lot::Mutex;

use super::{MinimizeOptions, Objective, OptimizeResult, RestartOptimizer};
use crate::bounds::Bounds;
use crate::error::Result;

/// Sufficient-decrease constant of the Armijo condition.
const ARMIJO_C: f64 = 1e-4;
/// Line-search steps below this length count as no progress.
const MIN_STEP: f64 = 1e-14;

/// Projected gradient descent with finite-difference gradients, restarted
/// from uniform random points in the search box.
///
/// Each local run takes steps along the negative central-difference
/// gradient, projects them back into the box, and backtracks until the
/// Armijo condition holds. The step length doubles after every accepted
/// step. The best point over all restarts is returned.
///
/// # Examples
///
/// ```
/// use surrogate_utils::Bounds;
/// use surrogate_utils::optimize::{MinimizeOptions, MultiStartMinimizer, RestartOptimizer};
///
/// let minimizer = MultiStartMinimizer::with_seed(1);
/// let bounds = Bounds::uniform(2, -2.0, 2.0).unwrap();
/// let sphere = |x: &[f64]| {
///     Ok::<_, surrogate_utils::Error>(x.iter().map(|v| (v - 0.5).powi(2)).sum::<f64>())
/// };
///
/// let res = minimizer
///     .minimize(&sphere, &bounds, 3, &MinimizeOptions::default())
///     .unwrap();
/// assert!(res.fun < 1e-6);
/// ```
pub struct MultiStartMinimizer {
    rng: Mutex<fastrand::Rng>,
}

impl MultiStartMinimizer {
    /// Creates a minimizer with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a minimizer with a fixed seed for reproducible restarts.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for MultiStartMinimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartOptimizer for MultiStartMinimizer {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        bounds: &Bounds,
        num_restarts: usize,
        options: &MinimizeOptions,
    ) -> Result<OptimizeResult> {
        let starts: Vec<Vec<f64>> = {
            let mut rng = self.rng.lock();
            (0..num_restarts.max(1))
                .map(|_| bounds.sample_uniform(&mut rng))
                .collect()
        };

        let mut best: Option<OptimizeResult> = None;
        let mut n_evals = 0;
        for x0 in &starts {
            let res = descend(objective, x0, Some(bounds), options)?;
            n_evals += res.n_evals;
            trace_debug!(fun = res.fun, converged = res.converged, "restart finished");
            let better = best.as_ref().is_none_or(|b| res.fun < b.fun || b.fun.is_nan());
            if better {
                best = Some(res);
            }
        }

        let mut best = best.ok_or(crate::Error::Internal("no restart produced a result"))?;
        best.n_evals = n_evals;
        Ok(best)
    }

    fn minimize_local(
        &self,
        objective: &Objective<'_>,
        x0: &[f64],
        bounds: Option<&Bounds>,
        options: &MinimizeOptions,
    ) -> Result<OptimizeResult> {
        descend(objective, x0, bounds, options)
    }
}

/// One projected-gradient run from `x0`.
fn descend(
    objective: &Objective<'_>,
    x0: &[f64],
    bounds: Option<&Bounds>,
    options: &MinimizeOptions,
) -> Result<OptimizeResult> {
    let mut x = x0.to_vec();
    if let Some(b) = bounds {
        b.clamp(&mut x);
    }
    let mut fx = objective(&x)?;
    let mut n_evals = 1;
    let mut step = options.initial_step;
    let mut converged = false;
    let mut iterations = 0;

    'outer: while iterations < options.max_iter {
        iterations += 1;

        let grad = fd_gradient(objective, &x, options.fd_step)?;
        n_evals += 2 * x.len();
        if grad.iter().any(|g| !g.is_finite()) {
            break;
        }

        loop {
            let mut candidate: Vec<f64> = x
                .iter()
                .zip(&grad)
                .map(|(xi, gi)| xi - step * gi)
                .collect();
            if let Some(b) = bounds {
                b.clamp(&mut candidate);
            }

            let moved = norm_diff(&candidate, &x);
            if moved <= options.tolerance * (1.0 + norm(&x)) {
                // projected gradient vanished (interior optimum or a face/corner)
                converged = true;
                break 'outer;
            }

            let f_candidate = objective(&candidate)?;
            n_evals += 1;
            let decrease: f64 = grad
                .iter()
                .zip(x.iter().zip(&candidate))
                .map(|(g, (xi, ci))| g * (xi - ci))
                .sum();

            if f_candidate <= fx - ARMIJO_C * decrease {
                let f_change = (fx - f_candidate).abs();
                x = candidate;
                let done = f_change <= options.tolerance * (1.0 + fx.abs());
                fx = f_candidate;
                step *= 2.0;
                if done {
                    converged = true;
                    break 'outer;
                }
                break;
            }

            step *= 0.5;
            if step < MIN_STEP {
                converged = true;
                break 'outer;
            }
        }
    }

    Ok(OptimizeResult {
        x,
        fun: fx,
        converged,
        iterations,
        n_evals,
    })
}

/// Central-difference gradient of `objective` at `x`.
fn fd_gradient(objective: &Objective<'_>, x: &[f64], h: f64) -> Result<Vec<f64>> {
    let mut shifted = x.to_vec();
    let mut grad = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        let hi = h * (1.0 + x[i].abs());
        shifted[i] = x[i] + hi;
        let f_plus = objective(&shifted)?;
        shifted[i] = x[i] - hi;
        let f_minus = objective(&shifted)?;
        shifted[i] = x[i];
        grad.push((f_plus - f_minus) / (2.0 * hi));
    }
    Ok(grad)
}

fn norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn norm_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(ai, bi)| (ai - bi).powi(2))
        .sum::<f64>()
        .sqrt()
}
