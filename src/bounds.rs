//! Axis-aligned search boxes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// A box `[low_i, high_i]` per dimension.
///
/// Used both for input-space search regions (Lipschitz estimation) and for
/// hyperparameter ranges (slice sampling, maximum-likelihood fitting).
///
/// # Examples
///
/// ```
/// use surrogate_utils::Bounds;
///
/// let bounds = Bounds::new(vec![(0.0, 1.0), (-2.0, 2.0)]).unwrap();
/// assert_eq!(bounds.dim(), 2);
/// assert!(bounds.contains(&[0.5, 0.0]));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBounds"))]
pub struct Bounds {
    ranges: Vec<(f64, f64)>,
}

/// Unchecked wire form of [`Bounds`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawBounds {
    ranges: Vec<(f64, f64)>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBounds> for Bounds {
    type Error = Error;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.ranges)
    }
}

impl Bounds {
    /// Creates bounds from `(low, high)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBounds` if any `low > high` or either end is
    /// not finite.
    pub fn new(ranges: Vec<(f64, f64)>) -> Result<Self> {
        for &(low, high) in &ranges {
            if !(low.is_finite() && high.is_finite()) || low > high {
                return Err(Error::InvalidBounds { low, high });
            }
        }
        Ok(Self { ranges })
    }

    /// Creates the same `[low, high]` range for each of `dim` dimensions.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBounds` if `low > high` or either end is not
    /// finite.
    pub fn uniform(dim: usize, low: f64, high: f64) -> Result<Self> {
        Self::new(vec![(low, high); dim])
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.ranges.len()
    }

    /// The `(low, high)` pairs.
    #[must_use]
    pub fn ranges(&self) -> &[(f64, f64)] {
        &self.ranges
    }

    /// Lower ends.
    #[must_use]
    pub fn lower(&self) -> Vec<f64> {
        self.ranges.iter().map(|&(lo, _)| lo).collect()
    }

    /// Upper ends.
    #[must_use]
    pub fn upper(&self) -> Vec<f64> {
        self.ranges.iter().map(|&(_, hi)| hi).collect()
    }

    /// Returns `true` if `x` has the right length and lies inside the box.
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.ranges.len()
            && x
                .iter()
                .zip(&self.ranges)
                .all(|(&v, &(lo, hi))| (lo..=hi).contains(&v))
    }

    /// Projects `x` onto the box in place.
    pub fn clamp(&self, x: &mut [f64]) {
        for (v, &(lo, hi)) in x.iter_mut().zip(&self.ranges) {
            *v = v.clamp(lo, hi);
        }
    }

    /// Returns the box in log space.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLogBounds` if any lower end is not positive.
    pub fn ln(&self) -> Result<Self> {
        if self.ranges.iter().any(|&(lo, _)| lo <= 0.0) {
            return Err(Error::InvalidLogBounds);
        }
        Ok(Self {
            ranges: self
                .ranges
                .iter()
                .map(|&(lo, hi)| (lo.ln(), hi.ln()))
                .collect(),
        })
    }

    /// Intersects `[x_i - radius_i, x_i + radius_i]` with this box, per
    /// dimension.
    ///
    /// If a neighbourhood misses the box entirely on some dimension, that
    /// dimension collapses onto the nearest face.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `x` or `radius` do not match
    /// the box dimension.
    pub fn around(&self, x: &[f64], radius: &[f64]) -> Result<Self> {
        check_dim(self.dim(), x.len())?;
        check_dim(self.dim(), radius.len())?;

        let ranges = self
            .ranges
            .iter()
            .zip(x.iter().zip(radius))
            .map(|(&(lo, hi), (&xi, &ri))| {
                let low = lo.max(xi - ri);
                let high = hi.min(xi + ri);
                if low <= high {
                    (low, high)
                } else if xi < lo {
                    (lo, lo)
                } else {
                    (hi, hi)
                }
            })
            .collect();
        Ok(Self { ranges })
    }

    /// Draws a point uniformly inside the box.
    pub(crate) fn sample_uniform(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        self.ranges
            .iter()
            .map(|&(lo, hi)| rng_util::f64_range(rng, lo, hi))
            .collect()
    }
}

/// Returns `Error::DimensionMismatch` unless `got == expected`.
pub(crate) fn check_dim(expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, got })
    }
}
