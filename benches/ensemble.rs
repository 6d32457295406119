use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nalgebra::{DMatrix, DVector};
use surrogate_utils::config::{OptimizationConfig, SliceConfig};
use surrogate_utils::slice::StepOutSliceSampler;
use surrogate_utils::{Bounds, GaussianProcess, Model, ModelEnsemble};

/// Slice-configured GP on `n` points of a 2-D sine surface.
fn build_gp(n: usize, n_samples: usize) -> GaussianProcess {
    let mut rng = fastrand::Rng::with_seed(42);
    let x = DMatrix::from_fn(n, 2, |_, _| rng.f64());
    let y = DVector::from_fn(n, |i, _| (3.0 * x[(i, 0)]).sin() + x[(i, 1)].powi(2));
    let config = SliceConfig::builder(n_samples)
        .burn_in(10)
        .hp_bounds(Bounds::uniform(4, 1e-3, 10.0).unwrap())
        .build()
        .unwrap();
    GaussianProcess::builder(2)
        .data(x, y)
        .config(OptimizationConfig::Slice(config))
        .build()
        .unwrap()
}

fn bench_ensemble_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensemble_optimize");
    group.sample_size(10);

    for n_samples in [2, 8] {
        group.bench_with_input(
            BenchmarkId::new("n_samples", n_samples),
            &n_samples,
            |b, &n_samples| {
                b.iter(|| {
                    let mut ensemble = ModelEnsemble::with_sampler(
                        build_gp(20, n_samples),
                        StepOutSliceSampler::with_seed(0),
                    )
                    .unwrap();
                    ensemble.optimize().unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_ensemble_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensemble_predict");
    let x_star = DMatrix::from_fn(100, 2, |i, j| ((i * 7 + j * 3) % 100) as f64 / 100.0);

    for n_train in [20, 100] {
        let sampler = StepOutSliceSampler::with_seed(1);
        let mut ensemble = ModelEnsemble::with_sampler(build_gp(n_train, 8), sampler).unwrap();
        ensemble.optimize().unwrap();
        group.bench_with_input(BenchmarkId::new("n_train", n_train), &ensemble, |b, ensemble| {
            b.iter(|| ensemble.predict(&x_star, false).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ensemble_optimize, bench_ensemble_predict);
criterion_main!(benches);
