/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Sample a value from the standard normal distribution using Box-Muller transform.
pub(crate) fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    // 1 - [0, 1) keeps u1 away from zero
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64() * core::f64::consts::TAU;
    (-2.0 * u1.ln()).sqrt() * u2.cos()
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_range_stays_in_interval() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..1000 {
            let v = f64_range(&mut rng, -2.0, 3.0);
            assert!((-2.0..3.0).contains(&v));
        }
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = fastrand::Rng::with_seed(42);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean} should be near 0");
        assert!((var - 1.0).abs() < 0.05, "variance {var} should be near 1");
        assert!(draws.iter().all(|z| z.is_finite()));
    }
}
