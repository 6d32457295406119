//! Bounded minimization with restarts.
//!
//! The Lipschitz estimator and the Gaussian-process fit both minimize a
//! black-box objective over a box. They go through the [`RestartOptimizer`]
//! trait so that callers can plug in their own solver; the crate ships
//! [`MultiStartMinimizer`] as the default.

mod multistart;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::multistart::MultiStartMinimizer;
use crate::bounds::Bounds;
use crate::error::Result;

/// Default iteration cap for one local minimization.
pub const DEFAULT_MAX_ITER: usize = 200;
/// Default relative tolerance on objective and step size.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;
/// Default finite-difference step.
pub const DEFAULT_FD_STEP: f64 = 1e-6;

/// Objective function evaluated by the optimizers.
pub type Objective<'a> = dyn Fn(&[f64]) -> Result<f64> + 'a;

/// Options for one local minimization.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MinimizeOptions {
    /// Maximum number of descent iterations.
    pub max_iter: usize,
    /// Relative tolerance on objective decrease and step length.
    pub tolerance: f64,
    /// Central finite-difference step for gradient estimates.
    pub fd_step: f64,
    /// Initial step length of the line search.
    pub initial_step: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            fd_step: DEFAULT_FD_STEP,
            initial_step: 1.0,
        }
    }
}

/// Outcome of a minimization.
///
/// The best point is reported even when `converged` is `false`.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizeResult {
    /// Best point found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub fun: f64,
    /// Whether the local solver met its stopping tolerance.
    pub converged: bool,
    /// Descent iterations of the run that produced `x`.
    pub iterations: usize,
    /// Total objective evaluations across all restarts.
    pub n_evals: usize,
}

/// A minimizer that can search a box from several starting points.
pub trait RestartOptimizer: Send + Sync {
    /// Minimizes `objective` inside `bounds`, starting from `num_restarts`
    /// points in the box, and returns the best result.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by `objective`.
    fn minimize(
        &self,
        objective: &Objective<'_>,
        bounds: &Bounds,
        num_restarts: usize,
        options: &MinimizeOptions,
    ) -> Result<OptimizeResult>;

    /// Runs one local minimization from `x0`, unconstrained if `bounds` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by `objective`.
    fn minimize_local(
        &self,
        objective: &Objective<'_>,
        x0: &[f64],
        bounds: Option<&Bounds>,
        options: &MinimizeOptions,
    ) -> Result<OptimizeResult>;
}
