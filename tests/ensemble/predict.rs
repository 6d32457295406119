use nalgebra::{DMatrix, DVector};
use surrogate_utils::{Error, Model, Variance};

use crate::seeded_ensemble;

fn query() -> DMatrix<f64> {
    DMatrix::from_row_slice(4, 1, &[0.1, 0.5, 0.9, 1.5])
}

#[test]
fn test_predict_before_sampling_fails() {
    let ensemble = seeded_ensemble(2, 0);
    assert!(matches!(ensemble.predict(&query(), false), Err(Error::NotSampled)));
    assert!(matches!(ensemble.predict_mixture(&query()), Err(Error::NotSampled)));
}

#[test]
fn test_predict_is_member_average() {
    let mut ensemble = seeded_ensemble(3, 0);
    // deliberately different hyperparameters per member
    ensemble
        .set_param_array(DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.2, 0.01, 0.5, 0.6, 0.05, 2.0, 1.5, 0.001],
        ))
        .unwrap();

    let x_star = query();
    let pred = ensemble.predict(&x_star, false).unwrap();

    let mut mean = DVector::zeros(4);
    let mut var = DVector::zeros(4);
    for member in ensemble.members() {
        let p = member.predict(&x_star, false).unwrap();
        mean += &p.mean;
        var += p.variance.diagonal();
    }
    mean /= 3.0;
    var /= 3.0;

    for i in 0..4 {
        assert!((pred.mean[i] - mean[i]).abs() < 1e-12);
        assert!((pred.variance.diagonal()[i] - var[i]).abs() < 1e-12);
    }
}

#[test]
fn test_full_covariance_average() {
    let mut ensemble = seeded_ensemble(2, 0);
    ensemble
        .set_param_array(DMatrix::from_row_slice(2, 3, &[1.0, 0.3, 0.01, 1.5, 0.8, 0.02]))
        .unwrap();

    let x_star = query();
    let pred = ensemble.predict(&x_star, true).unwrap();
    let Variance::Full(cov) = &pred.variance else {
        panic!("expected full covariance");
    };

    let a = ensemble.members()[0].predict(&x_star, true).unwrap();
    let b = ensemble.members()[1].predict(&x_star, true).unwrap();
    let (Variance::Full(ca), Variance::Full(cb)) = (a.variance, b.variance) else {
        panic!("members returned diagonal variance");
    };
    let expected = (ca + cb) * 0.5;
    assert!((cov - expected).amax() < 1e-12);
}

#[test]
fn test_log_density_matches_gaussian() {
    let mut ensemble = seeded_ensemble(2, 4);
    ensemble.optimize().unwrap();

    let x_star = query();
    let y_star = DVector::from_vec(vec![0.8, 1.4, 0.3, -0.2]);
    let (pred, log_prob) = ensemble.predict_with_target(&x_star, &y_star, true).unwrap();

    let var = pred.variance.diagonal();
    for i in 0..4 {
        let log_norm = (2.0 * std::f64::consts::PI * var[i]).ln();
        let expected = -0.5 * (log_norm + (y_star[i] - pred.mean[i]).powi(2) / var[i]);
        assert!((log_prob[i] - expected).abs() < 1e-10);
    }
}

#[test]
fn test_log_density_length_checked() {
    let mut ensemble = seeded_ensemble(1, 0);
    ensemble.optimize().unwrap();
    assert!(matches!(
        ensemble.predict_with_target(&query(), &DVector::zeros(3), false),
        Err(Error::DimensionMismatch { expected: 4, got: 3 })
    ));
}

#[test]
fn test_mixture_adds_mean_spread() {
    let mut ensemble = seeded_ensemble(2, 0);
    ensemble
        .set_param_array(DMatrix::from_row_slice(2, 3, &[1.0, 0.1, 0.01, 1.0, 2.0, 0.01]))
        .unwrap();

    let x_star = query();
    let avg = ensemble.predict(&x_star, false).unwrap();
    let mix = ensemble.predict_mixture(&x_star).unwrap();

    let m0 = ensemble.members()[0].predict(&x_star, false).unwrap().mean;
    let m1 = ensemble.members()[1].predict(&x_star, false).unwrap().mean;
    for i in 0..4 {
        let spread = 0.25 * (m0[i] - m1[i]).powi(2);
        let expected = avg.variance.diagonal()[i] + spread;
        assert!((mix.variance.diagonal()[i] - expected).abs() < 1e-9);
    }
}
