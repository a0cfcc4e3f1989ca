//! Accuracy regression tests for vocalign-gmm.
//!
//! These tests verify that algorithmic changes do not degrade mixture fitting
//! or joint-model regression on small synthetic datasets.

use ndarray::{Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use vocalign_gmm::{CovarianceType, GaussianMixture, GmmConfig, MlParameterGeneration};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 60 points per blob around (0, 0), (8, 0) and (0, 8), uniform jitter ±1.
fn three_blobs(seed: u64) -> Array2<f64> {
    let centers = [[0.0, 0.0], [8.0, 0.0], [0.0, 8.0]];
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::<f64>::zeros((180, 2));
    for (i, mut row) in data.axis_iter_mut(Axis(0)).enumerate() {
        let c = centers[i / 60];
        row[0] = c[0] + rng.gen_range(-1.0..1.0);
        row[1] = c[1] + rng.gen_range(-1.0..1.0);
    }
    data
}

// ---------------------------------------------------------------------------
// a) well_separated_blobs_are_recovered
// ---------------------------------------------------------------------------

#[test]
fn well_separated_blobs_are_recovered() {
    let data = three_blobs(7);
    let gmm = GmmConfig::new(3, CovarianceType::Full)
        .unwrap()
        .with_n_init(3)
        .fit(data.view())
        .unwrap();

    assert!(gmm.converged(), "EM should converge on separated blobs");
    let labels = gmm.predict(data.view()).unwrap();
    for blob in labels.chunks(60) {
        assert!(blob.iter().all(|l| *l == blob[0]), "blob split across components");
    }
    assert_ne!(labels[0], labels[60]);
    assert_ne!(labels[60], labels[120]);
    assert_ne!(labels[0], labels[120]);

    for w in gmm.weights() {
        assert!((w - 1.0 / 3.0).abs() < 1e-6, "weight {w} should be one third");
    }
}

// ---------------------------------------------------------------------------
// b) lower_bound_is_non_decreasing
// ---------------------------------------------------------------------------

/// With a fixed seed, a fit capped at `i` iterations is a prefix of the fit
/// capped at `i + 1`, so the recorded bounds trace the EM trajectory.
#[test]
fn lower_bound_is_non_decreasing() {
    let data = three_blobs(11);
    let mut previous = f64::NEG_INFINITY;
    for max_iter in 1..=8 {
        let gmm = GmmConfig::new(4, CovarianceType::Full)
            .unwrap()
            .with_reg_covar(0.0)
            .with_tol(0.0)
            .with_max_iter(max_iter)
            .fit(data.view())
            .unwrap();
        let bound = gmm.lower_bound().value();
        assert!(
            bound >= previous - 1e-9,
            "lower bound decreased at max_iter={max_iter}: {previous} -> {bound}"
        );
        previous = bound;
    }
}

// ---------------------------------------------------------------------------
// c) linear_joint_regression_reproduces_map
// ---------------------------------------------------------------------------

#[test]
fn linear_joint_regression_reproduces_map() {
    // y = A x + b with small noise; a single full-covariance component
    // captures the joint distribution exactly.
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let n = 400;
    let mut joint = Array2::<f64>::zeros((n, 4));
    for mut row in joint.axis_iter_mut(Axis(0)) {
        let x0: f64 = rng.gen_range(-2.0..2.0);
        let x1: f64 = rng.gen_range(-2.0..2.0);
        row[0] = x0;
        row[1] = x1;
        row[2] = 1.5 * x0 - 0.5 * x1 + 2.0 + rng.gen_range(-0.01..0.01);
        row[3] = 0.3 * x0 + x1 - 1.0 + rng.gen_range(-0.01..0.01);
    }

    let gmm = GmmConfig::new(1, CovarianceType::Full).unwrap().fit(joint.view()).unwrap();
    let mlpg = MlParameterGeneration::new(&gmm, 2).unwrap();
    assert_eq!(mlpg.input_dim(), 2);
    assert_eq!(mlpg.output_dim(), 2);

    let probe = ndarray::array![[0.0, 0.0], [1.0, -1.0], [-1.5, 0.5]];
    let predicted = mlpg.transform(probe.view()).unwrap();
    for (x, y) in probe.axis_iter(Axis(0)).zip(predicted.axis_iter(Axis(0))) {
        let expected0 = 1.5 * x[0] - 0.5 * x[1] + 2.0;
        let expected1 = 0.3 * x[0] + x[1] - 1.0;
        assert!((y[0] - expected0).abs() < 0.02, "got {}, expected {expected0}", y[0]);
        assert!((y[1] - expected1).abs() < 0.02, "got {}, expected {expected1}", y[1]);
    }
}

// ---------------------------------------------------------------------------
// d) model_survives_json_round_trip
// ---------------------------------------------------------------------------

#[test]
fn model_survives_json_round_trip() {
    let data = three_blobs(5);
    let gmm = GmmConfig::new(3, CovarianceType::Diagonal).unwrap().fit(data.view()).unwrap();

    let json = serde_json::to_string(&gmm).unwrap();
    let restored: GaussianMixture = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.covariance_type(), CovarianceType::Diagonal);
    assert_eq!(restored.n_iter(), gmm.n_iter());
    let a = gmm.score(data.view()).unwrap().value();
    let b = restored.score(data.view()).unwrap().value();
    assert!((a - b).abs() < 1e-9);
}

#[test]
fn invalid_json_model_is_rejected() {
    let data = three_blobs(5);
    let gmm = GmmConfig::new(2, CovarianceType::Full).unwrap().fit(data.view()).unwrap();
    let mut value = serde_json::to_value(&gmm).unwrap();
    value["weights"]["data"] = serde_json::json!([0.9, 0.9]);
    assert!(serde_json::from_value::<GaussianMixture>(value).is_err());
}
