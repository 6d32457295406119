mod data;
mod predict;
mod sampling;

use nalgebra::{DMatrix, DVector};
use surrogate_utils::config::{OptimizationConfig, SliceConfig};
use surrogate_utils::slice::StepOutSliceSampler;
use surrogate_utils::{Bounds, GaussianProcess, ModelEnsemble};

/// 1-D training set with a smooth bump.
fn bump_data() -> (DMatrix<f64>, DVector<f64>) {
    let x = DMatrix::from_row_slice(6, 1, &[0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
    let y = x.column(0).map(|v: f64| (4.0 * v).sin() + 0.5);
    (x, y)
}

/// GP over one input dimension configured for slice sampling.
fn slice_gp(n_samples: usize, burn_in: usize) -> GaussianProcess {
    let (x, y) = bump_data();
    let config = SliceConfig::builder(n_samples)
        .burn_in(burn_in)
        .sigma(0.5)
        .hp_bounds(Bounds::uniform(3, 1e-3, 20.0).unwrap())
        .build()
        .unwrap();
    GaussianProcess::builder(1)
        .data(x, y)
        .config(OptimizationConfig::Slice(config))
        .build()
        .unwrap()
}

fn seeded_ensemble(n_samples: usize, seed: u64) -> ModelEnsemble<GaussianProcess> {
    let sampler = StepOutSliceSampler::with_seed(seed);
    ModelEnsemble::with_sampler(slice_gp(n_samples, 5), sampler).unwrap()
}
