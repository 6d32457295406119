//! Hyperparameter fitting configuration for surrogate models.
//!
//! A surrogate either fits a single point estimate of its hyperparameters
//! ([`OptimizationConfig::Grad`]) or is meant to be wrapped in a
//! [`ModelEnsemble`](crate::ModelEnsemble) that draws slice samples
//! ([`OptimizationConfig::Slice`]). Both variants are validated by their
//! builders, so downstream code never re-checks them.
//!
//! | Option | Variant | Default |
//! |--------|---------|---------|
//! | `n_samples` | slice | required |
//! | `burn_in` | slice | 100 |
//! | `sigma` | slice | 1.0 |
//! | `num_restarts` | grad | 5 |
//! | `hp_bounds` | both | none |

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::error::{Error, Result};
use crate::optimize::MinimizeOptions;

/// Default number of discarded slice-sampling steps.
pub const DEFAULT_BURN_IN: usize = 100;
/// Default slice-sampler bracket width (log space).
pub const DEFAULT_SIGMA: f64 = 1.0;
/// Default number of restarts for maximum-likelihood fitting.
pub const DEFAULT_NUM_RESTARTS: usize = 5;

/// How a surrogate obtains its hyperparameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OptimizationConfig {
    /// Pointwise maximum-likelihood fit with a gradient-based optimizer.
    Grad(GradConfig),
    /// Slice sampling over log-hyperparameters, handled by an ensemble.
    Slice(SliceConfig),
}

impl OptimizationConfig {
    /// Short name of the method, used in error messages and logs.
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Grad(_) => "grad",
            Self::Slice(_) => "slice",
        }
    }

    /// Hyperparameter bounds (natural space), if any.
    #[must_use]
    pub fn hp_bounds(&self) -> Option<&Bounds> {
        match self {
            Self::Grad(c) => c.hp_bounds.as_ref(),
            Self::Slice(c) => c.hp_bounds.as_ref(),
        }
    }
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self::Grad(GradConfig::default())
    }
}

/// Settings for pointwise maximum-likelihood fitting.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawGradConfig"))]
pub struct GradConfig {
    hp_bounds: Option<Bounds>,
    num_restarts: usize,
    options: MinimizeOptions,
}

/// Unchecked wire form of [`GradConfig`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawGradConfig {
    hp_bounds: Option<Bounds>,
    num_restarts: usize,
    options: MinimizeOptions,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGradConfig> for GradConfig {
    type Error = Error;

    fn try_from(raw: RawGradConfig) -> Result<Self> {
        let mut builder = GradConfig::builder()
            .num_restarts(raw.num_restarts)
            .options(raw.options);
        if let Some(b) = raw.hp_bounds {
            builder = builder.hp_bounds(b);
        }
        builder.build()
    }
}

impl GradConfig {
    /// Creates a builder for configuring a `GradConfig`.
    #[must_use]
    pub fn builder() -> GradConfigBuilder {
        GradConfigBuilder::default()
    }

    /// Hyperparameter bounds (natural space), if any.
    #[must_use]
    pub fn hp_bounds(&self) -> Option<&Bounds> {
        self.hp_bounds.as_ref()
    }

    /// Number of optimizer restarts.
    #[must_use]
    pub fn num_restarts(&self) -> usize {
        self.num_restarts
    }

    /// Options for each local minimization.
    #[must_use]
    pub fn options(&self) -> &MinimizeOptions {
        &self.options
    }
}

impl Default for GradConfig {
    fn default() -> Self {
        Self {
            hp_bounds: None,
            num_restarts: DEFAULT_NUM_RESTARTS,
            options: MinimizeOptions::default(),
        }
    }
}

/// Builder for [`GradConfig`].
#[derive(Clone, Debug, Default)]
pub struct GradConfigBuilder {
    hp_bounds: Option<Bounds>,
    num_restarts: Option<usize>,
    options: Option<MinimizeOptions>,
}

impl GradConfigBuilder {
    /// Restricts hyperparameters to a box (natural space, positive).
    #[must_use]
    pub fn hp_bounds(mut self, bounds: Bounds) -> Self {
        self.hp_bounds = Some(bounds);
        self
    }

    /// Sets the number of optimizer restarts.
    ///
    /// Default: 5.
    #[must_use]
    pub fn num_restarts(mut self, n: usize) -> Self {
        self.num_restarts = Some(n);
        self
    }

    /// Sets the local minimizer options.
    #[must_use]
    pub fn options(mut self, options: MinimizeOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `num_restarts` is zero and
    /// `Error::InvalidLogBounds` if the bounds are not strictly positive.
    pub fn build(self) -> Result<GradConfig> {
        let num_restarts = self.num_restarts.unwrap_or(DEFAULT_NUM_RESTARTS);
        if num_restarts == 0 {
            return Err(Error::InvalidConfig("num_restarts must be at least 1"));
        }
        if let Some(b) = &self.hp_bounds {
            b.ln()?;
        }
        Ok(GradConfig {
            hp_bounds: self.hp_bounds,
            num_restarts,
            options: self.options.unwrap_or_default(),
        })
    }
}

/// Settings for slice sampling of hyperparameters.
///
/// # Examples
///
/// ```
/// use surrogate_utils::config::SliceConfig;
///
/// let config = SliceConfig::builder(10).burn_in(50).sigma(0.5).build().unwrap();
/// assert_eq!(config.n_samples(), 10);
/// assert_eq!(config.burn_in(), 50);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSliceConfig"))]
pub struct SliceConfig {
    n_samples: usize,
    burn_in: usize,
    sigma: f64,
    hp_bounds: Option<Bounds>,
}

/// Unchecked wire form of [`SliceConfig`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawSliceConfig {
    n_samples: usize,
    burn_in: usize,
    sigma: f64,
    hp_bounds: Option<Bounds>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSliceConfig> for SliceConfig {
    type Error = Error;

    fn try_from(raw: RawSliceConfig) -> Result<Self> {
        let mut builder = SliceConfig::builder(raw.n_samples)
            .burn_in(raw.burn_in)
            .sigma(raw.sigma);
        if let Some(b) = raw.hp_bounds {
            builder = builder.hp_bounds(b);
        }
        builder.build()
    }
}

impl SliceConfig {
    /// Creates a builder for an ensemble of `n_samples` members.
    #[must_use]
    pub fn builder(n_samples: usize) -> SliceConfigBuilder {
        SliceConfigBuilder {
            n_samples,
            burn_in: None,
            sigma: None,
            hp_bounds: None,
        }
    }

    /// Ensemble size, i.e. number of recorded samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of discarded chain steps before recording.
    #[must_use]
    pub fn burn_in(&self) -> usize {
        self.burn_in
    }

    /// Slice bracket width in log space.
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Hyperparameter bounds (natural space), if any.
    #[must_use]
    pub fn hp_bounds(&self) -> Option<&Bounds> {
        self.hp_bounds.as_ref()
    }
}

/// Builder for [`SliceConfig`].
#[derive(Clone, Debug)]
pub struct SliceConfigBuilder {
    n_samples: usize,
    burn_in: Option<usize>,
    sigma: Option<f64>,
    hp_bounds: Option<Bounds>,
}

impl SliceConfigBuilder {
    /// Sets the number of discarded steps.
    ///
    /// Default: 100.
    #[must_use]
    pub fn burn_in(mut self, n: usize) -> Self {
        self.burn_in = Some(n);
        self
    }

    /// Sets the initial slice bracket width.
    ///
    /// Default: 1.0.
    #[must_use]
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    /// Restricts hyperparameters to a box (natural space, positive).
    #[must_use]
    pub fn hp_bounds(mut self, bounds: Bounds) -> Self {
        self.hp_bounds = Some(bounds);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `n_samples` is zero or `sigma` is
    /// not a positive finite number, and `Error::InvalidLogBounds` if the
    /// bounds are not strictly positive.
    pub fn build(self) -> Result<SliceConfig> {
        if self.n_samples == 0 {
            return Err(Error::InvalidConfig("n_samples must be at least 1"));
        }
        let sigma = self.sigma.unwrap_or(DEFAULT_SIGMA);
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::InvalidConfig("sigma must be positive and finite"));
        }
        if let Some(b) = &self.hp_bounds {
            b.ln()?;
        }
        Ok(SliceConfig {
            n_samples: self.n_samples,
            burn_in: self.burn_in.unwrap_or(DEFAULT_BURN_IN),
            sigma,
            hp_bounds: self.hp_bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_defaults() {
        let c = SliceConfig::builder(4).build().unwrap();
        assert_eq!(c.n_samples(), 4);
        assert_eq!(c.burn_in(), DEFAULT_BURN_IN);
        assert!((c.sigma() - DEFAULT_SIGMA).abs() < f64::EPSILON);
        assert!(c.hp_bounds().is_none());
    }

    #[test]
    fn test_slice_rejects_empty_ensemble() {
        assert!(matches!(
            SliceConfig::builder(0).build(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_slice_rejects_bad_sigma() {
        assert!(SliceConfig::builder(2).sigma(0.0).build().is_err());
        assert!(SliceConfig::builder(2).sigma(f64::NAN).build().is_err());
    }

    #[test]
    fn test_rejects_non_positive_hp_bounds() {
        let b = Bounds::new(vec![(0.0, 1.0)]).unwrap();
        assert!(matches!(
            SliceConfig::builder(2).hp_bounds(b.clone()).build(),
            Err(Error::InvalidLogBounds)
        ));
        assert!(matches!(
            GradConfig::builder().hp_bounds(b).build(),
            Err(Error::InvalidLogBounds)
        ));
    }

    #[test]
    fn test_grad_rejects_zero_restarts() {
        assert!(GradConfig::builder().num_restarts(0).build().is_err());
    }

    #[test]
    fn test_method_name_and_bounds() {
        let b = Bounds::uniform(3, 0.1, 10.0).unwrap();
        let c = OptimizationConfig::Slice(
            SliceConfig::builder(2)
                .hp_bounds(b.clone())
                .build()
                .unwrap(),
        );
        assert_eq!(c.method_name(), "slice");
        assert_eq!(c.hp_bounds(), Some(&b));
        assert_eq!(OptimizationConfig::default().method_name(), "grad");
    }
}
