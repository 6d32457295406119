#![allow(clippy::cast_precision_loss)]

use nalgebra::{DMatrix, DVector};
use surrogate_utils::{Error, NoisySampler};

fn branin(x: &DMatrix<f64>) -> DVector<f64> {
    let pi = std::f64::consts::PI;
    DVector::from_fn(x.nrows(), |i, _| {
        let (x1, x2) = (x[(i, 0)], x[(i, 1)]);
        let b = 5.1 / (4.0 * pi * pi);
        let c = 5.0 / pi;
        let t = 1.0 / (8.0 * pi);
        (x2 - b * x1 * x1 + c * x1 - 6.0).powi(2) + 10.0 * (1.0 - t) * x1.cos() + 10.0
    })
}

#[test]
fn zero_noise_is_deterministic() {
    let x = DMatrix::from_row_slice(3, 2, &[-3.0, 2.0, 0.5, 7.5, 9.0, 1.0]);
    let sample = NoisySampler::new().request(&x, branin, 0.0, 0.0).unwrap();
    assert_eq!(sample.x_sample, x);
    assert_eq!(sample.f_sample(), Some(&branin(&x)));
    assert_eq!(sample.f_of_x(), Some(&branin(&x)));
}

#[test]
fn input_noise_has_requested_std() {
    let sigma_x = 0.3;
    let x = DMatrix::from_element(200, 10, 1.5);
    let sample = NoisySampler::with_seed(17).request_inputs(&x, sigma_x).unwrap();
    assert!(sample.outputs.is_none());

    let diff = &sample.x_sample - &x;
    let n = diff.len() as f64;
    let mean = diff.sum() / n;
    let std = (diff.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    assert!(mean.abs() < 0.02, "mean {mean}");
    assert!((std - sigma_x).abs() < 0.02, "std {std}");
    assert!((&diff - &sample.delta_x).amax() < 1e-12);
}

#[test]
fn output_noise_has_requested_std() {
    let sigma_y = 2.0;
    let x = DMatrix::from_element(4000, 2, 0.0);
    let sample = NoisySampler::with_seed(5)
        .request(&x, branin, 0.0, sigma_y)
        .unwrap();
    let out = sample.outputs.unwrap();
    let n = out.delta_y.len() as f64;
    let mean = out.delta_y.sum() / n;
    let std = (out.delta_y.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    assert!((std - sigma_y).abs() < 0.1, "std {std}");
    assert_eq!(out.f_of_x, out.f_of_x_sample);
}

#[test]
fn seeded_samplers_repeat() {
    let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let a = NoisySampler::with_seed(9).request(&x, branin, 0.1, 0.1).unwrap();
    let b = NoisySampler::with_seed(9).request(&x, branin, 0.1, 0.1).unwrap();
    assert_eq!(a, b);
}

#[test]
fn negative_sigma_rejected() {
    let x = DMatrix::zeros(1, 2);
    let err = NoisySampler::new().request(&x, branin, -0.1, 0.0).unwrap_err();
    assert!(matches!(err, Error::InvalidNoise(v) if v == -0.1));
}
