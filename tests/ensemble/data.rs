use nalgebra::{DMatrix, DVector};
use surrogate_utils::{Error, Model};

use crate::{bump_data, seeded_ensemble};

#[test]
fn test_set_data_propagates_to_members() {
    let mut ensemble = seeded_ensemble(3, 0);
    let x = DMatrix::from_row_slice(3, 1, &[0.1, 0.45, 0.7]);
    let y = DVector::from_vec(vec![2.0, -1.0, 5.0]);
    ensemble.set_data(x.clone(), y.clone()).unwrap();

    let original = ensemble.original();
    assert_eq!(original.x(), &x);
    assert!((original.y_mean() - 2.0).abs() < 1e-15);
    let recentred = original.y().add_scalar(original.y_mean());

    for member in ensemble.members() {
        assert_eq!(member.x(), original.x());
        let member_y = member.y().add_scalar(member.y_mean());
        assert!((member_y - &recentred).amax() < 1e-12);
    }
}

#[test]
fn test_set_xy_alias() {
    let mut ensemble = seeded_ensemble(2, 0);
    let (x, y) = bump_data();
    ensemble.set_xy(x.rows(0, 3).into_owned(), y.rows(0, 3).into_owned()).unwrap();
    assert_eq!(ensemble.x().nrows(), 3);
    for member in ensemble.members() {
        assert_eq!(member.x().nrows(), 3);
    }
}

#[test]
fn test_set_data_shape_checked() {
    let mut ensemble = seeded_ensemble(2, 0);
    let err = ensemble
        .set_data(DMatrix::zeros(3, 1), DVector::zeros(2))
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn test_reads_forward_to_original() {
    let ensemble = seeded_ensemble(2, 0);
    let original = ensemble.original();
    assert_eq!(ensemble.x(), original.x());
    assert_eq!(ensemble.y(), original.y());
    assert_eq!(ensemble.lengthscale(), original.lengthscale());

    let x_star = DMatrix::from_row_slice(2, 1, &[0.3, 0.7]);
    assert_eq!(
        ensemble.dmu_dx(&x_star).unwrap(),
        original.dmu_dx(&x_star).unwrap()
    );
}

#[test]
fn test_predictions_follow_new_data() {
    let mut ensemble = seeded_ensemble(2, 1);
    ensemble.optimize().unwrap();
    let x_star = DMatrix::from_row_slice(1, 1, &[0.5]);
    let before = ensemble.predict(&x_star, false).unwrap();

    let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
    ensemble.set_data(x, DVector::from_vec(vec![100.0, 100.0])).unwrap();
    let after = ensemble.predict(&x_star, false).unwrap();
    assert!((after.mean[0] - 100.0).abs() < (before.mean[0] - 100.0).abs());
}
