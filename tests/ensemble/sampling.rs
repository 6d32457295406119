use std::sync::Arc;

use nalgebra::DMatrix;
use parking_lot::Mutex;
use surrogate_utils::config::{GradConfig, OptimizationConfig};
use surrogate_utils::slice::{LogDensity, SliceSampler};
use surrogate_utils::{Bounds, Error, GaussianProcess, Model, ModelEnsemble, Result, Surrogate};

use crate::{seeded_ensemble, slice_gp};

const STEP: f64 = 0.01;

/// Records every state it is handed and moves each coordinate by `STEP`,
/// checking the supplied density against the model objective on the way.
struct RecordingSampler {
    reference: GaussianProcess,
    calls: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl SliceSampler for RecordingSampler {
    fn step(
        &self,
        x: &[f64],
        log_density: &mut LogDensity<'_>,
        _sigma: f64,
        _bounds: Option<&Bounds>,
    ) -> Result<Vec<f64>> {
        let expected = -self.reference.objective_log_theta(x)?;
        assert!((log_density(x)? - expected).abs() < 1e-12);
        self.calls.lock().push(x.to_vec());
        Ok(x.iter().map(|v| v + STEP).collect())
    }
}

fn member_params(ensemble: &ModelEnsemble<GaussianProcess>) -> Vec<Vec<f64>> {
    ensemble
        .members()
        .iter()
        .map(|m| m.param_array().to_vec())
        .collect()
}

#[test]
fn test_rejects_grad_configured_model() {
    let gp = GaussianProcess::builder(1)
        .config(OptimizationConfig::Grad(GradConfig::default()))
        .build()
        .unwrap();
    let err = ModelEnsemble::new(gp).err().unwrap();
    assert!(matches!(err, Error::NotSamplingModel { method: "grad" }));
}

#[test]
fn test_original_switched_to_grad() {
    let ensemble = ModelEnsemble::new(slice_gp(3, 2)).unwrap();
    assert!(matches!(
        ensemble.original().opt_config(),
        OptimizationConfig::Grad(_)
    ));
    assert_eq!(ensemble.config().n_samples(), 3);
    assert_eq!(ensemble.config().burn_in(), 2);
    for member in ensemble.members() {
        assert_eq!(member.param_array(), ensemble.original().param_array());
        assert!(matches!(member.opt_config(), OptimizationConfig::Grad(_)));
    }
}

#[test]
fn test_optimize_fills_every_member() {
    for n in [1, 2, 5] {
        let mut ensemble = seeded_ensemble(n, 10 + n as u64);
        ensemble.optimize().unwrap();

        let samples = ensemble.param_array().unwrap();
        assert_eq!(samples.nrows(), n);
        assert_eq!(samples.ncols(), 3);
        for (i, member) in ensemble.members().iter().enumerate() {
            let row: Vec<f64> = samples.row(i).iter().copied().collect();
            assert_eq!(member.param_array(), row.as_slice());
        }
    }
}

#[test]
fn test_optimize_continues_chain() {
    let mut ensemble = seeded_ensemble(2, 3);
    ensemble.optimize().unwrap();
    let after_first: Vec<f64> = ensemble.original().param_array().to_vec();
    let last_row: Vec<f64> = ensemble
        .param_array()
        .unwrap()
        .row(1)
        .iter()
        .copied()
        .collect();
    assert_eq!(after_first, last_row);

    ensemble.optimize().unwrap();
    assert_eq!(ensemble.param_array().unwrap().nrows(), 2);
}

#[test]
fn test_sample_assignment_is_idempotent() {
    let mut ensemble = seeded_ensemble(2, 0);
    let samples = DMatrix::from_row_slice(2, 3, &[1.0, 0.3, 0.01, 2.0, 0.5, 0.02]);

    ensemble.set_param_array(samples.clone()).unwrap();
    let first = member_params(&ensemble);
    ensemble.set_param_array(samples.clone()).unwrap();
    let second = member_params(&ensemble);

    assert_eq!(first, second);
    assert_eq!(ensemble.param_array(), Some(&samples));
    assert_eq!(first[1], vec![2.0, 0.5, 0.02]);
}

#[test]
fn test_wrong_sample_count_leaves_members_untouched() {
    let mut ensemble = seeded_ensemble(3, 0);
    let before = member_params(&ensemble);

    let err = ensemble
        .set_param_array(DMatrix::from_element(2, 3, 0.5))
        .unwrap_err();
    assert!(matches!(err, Error::SampleCountMismatch { expected: 3, got: 2 }));

    let err = ensemble
        .set_param_array(DMatrix::from_element(3, 2, 0.5))
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, got: 2 }));

    let negative = DMatrix::from_row_slice(3, 3, &[1.0, 1.0, 0.1, 1.0, -1.0, 0.1, 1.0, 1.0, 0.1]);
    let err = ensemble.set_param_array(negative).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { index: 1, .. }));

    let after = member_params(&ensemble);
    assert_eq!(before, after);
    assert!(!ensemble.is_sampled());
}

#[test]
fn test_samples_inside_hp_bounds() {
    let mut ensemble = seeded_ensemble(6, 21);
    ensemble.optimize().unwrap();
    let hp = ensemble.config().hp_bounds().unwrap().clone();
    for row in ensemble.param_array().unwrap().row_iter() {
        for (v, &(lo, hi)) in row.iter().zip(hp.ranges()) {
            assert!(
                *v >= lo * (1.0 - 1e-9) && *v <= hi * (1.0 + 1e-9),
                "{v} not in [{lo}, {hi}]"
            );
        }
    }
}

#[test]
fn test_chain_runs_burn_in_then_one_step_per_sample() {
    let (n_samples, burn_in) = (3, 7);
    let gp = slice_gp(n_samples, burn_in);
    let start: Vec<f64> = gp.param_array().iter().map(|p| p.ln()).collect();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sampler = RecordingSampler {
        reference: gp.clone(),
        calls: Arc::clone(&calls),
    };

    let mut ensemble = ModelEnsemble::with_sampler(gp, sampler).unwrap();
    ensemble.optimize().unwrap();

    let calls = calls.lock();
    assert_eq!(calls.len(), burn_in + n_samples);
    assert_eq!(calls[0], start);
    for pair in calls.windows(2) {
        for (next, prev) in pair[1].iter().zip(&pair[0]) {
            assert!((next - prev - STEP).abs() < 1e-12);
        }
    }

    let samples = ensemble.param_array().unwrap();
    for i in 0..n_samples {
        for (j, state) in calls[burn_in + i].iter().enumerate() {
            let expected = (state + STEP).exp();
            assert!((samples[(i, j)] - expected).abs() < 1e-12, "row {i} column {j}");
        }
    }
    let last: Vec<f64> = samples.row(n_samples - 1).iter().copied().collect();
    assert_eq!(ensemble.original().param_array(), last.as_slice());
}
