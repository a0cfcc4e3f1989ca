//! Accuracy regression tests for the batch aligners.
//!
//! These tests pin the observable alignment contract: output shapes, path
//! monotonicity, truncation of overlong paths, and the terminal re-slice of
//! the iterative aligner.

use ndarray::{Array3, Axis, s};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use vocalign::{
    BandConstraint, CovarianceType, DtwMethod, GmmConfig, IterativeAligner, PairwiseAligner,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Random batch with values in [0.1, 1.0), so no frame is zero padding.
fn random_batch(rng: &mut ChaCha8Rng, n: usize, t: usize, d: usize) -> Array3<f64> {
    Array3::from_shape_fn((n, t, d), |_| rng.gen_range(0.1..1.0))
}

/// Zero the trailing `pad` frames of every item.
fn pad_tail(batch: &mut Array3<f64>, pad: usize) {
    let t = batch.len_of(Axis(1));
    batch.slice_mut(s![.., t - pad.., ..]).fill(0.0);
}

fn small_gmm() -> GmmConfig {
    GmmConfig::new(2, CovarianceType::Full)
        .unwrap()
        .with_max_iter(30)
        .with_reg_covar(1e-3)
}

// ---------------------------------------------------------------------------
// a) unpadded_batches_keep_shape
// ---------------------------------------------------------------------------

#[test]
fn unpadded_batches_keep_shape() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let x = random_batch(&mut rng, 3, 8, 4);
    let y = random_batch(&mut rng, 3, 8, 4);
    let (xa, ya) = PairwiseAligner::new().transform(x.view(), y.view()).unwrap();
    assert_eq!(xa.dim(), x.dim());
    assert_eq!(ya.dim(), y.dim());
}

// ---------------------------------------------------------------------------
// b) identical_batches_align_to_themselves
// ---------------------------------------------------------------------------

#[test]
fn identical_batches_align_to_themselves() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let x = random_batch(&mut rng, 2, 10, 3);
    for method in [DtwMethod::default(), DtwMethod::Exact(BandConstraint::Unconstrained)] {
        let (xa, ya, reports) = PairwiseAligner::new()
            .with_method(method)
            .transform_with_report(x.view(), x.view())
            .unwrap();
        assert_eq!(xa, x);
        assert_eq!(ya, x);
        for report in &reports {
            let diagonal: Vec<usize> = (0..10).collect();
            assert_eq!(report.path.source_indices(), diagonal);
            assert_eq!(report.path.target_indices(), diagonal);
        }
    }
}

// ---------------------------------------------------------------------------
// c) paths_are_monotonic
// ---------------------------------------------------------------------------

#[test]
fn paths_are_monotonic() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut x = random_batch(&mut rng, 4, 20, 3);
    let mut y = random_batch(&mut rng, 4, 20, 3);
    pad_tail(&mut x, 3);
    pad_tail(&mut y, 7);
    let (_, _, reports) = PairwiseAligner::new()
        .transform_with_report(x.view(), y.view())
        .unwrap();
    for report in &reports {
        assert!(report.path.is_monotonic());
        assert_eq!(report.source_len, 17);
        assert_eq!(report.target_len, 13);
        assert!(report.path.len() >= 17);
        let first = report.path.steps()[0];
        let last = report.path.steps()[report.path.len() - 1];
        assert_eq!((first.a, first.b), (0, 0));
        assert_eq!((last.a, last.b), (16, 12));
    }
}

// ---------------------------------------------------------------------------
// d) overlong_path_is_truncated
// ---------------------------------------------------------------------------

/// The only zero-cost path has eight steps; only the first five fit.
#[test]
fn overlong_path_is_truncated() {
    let x = Array3::from_shape_vec((1, 5, 1), vec![1.0, 1.0, 1.0, 1.0, 9.0]).unwrap();
    let y = Array3::from_shape_vec((1, 5, 1), vec![1.0, 9.0, 9.0, 9.0, 9.0]).unwrap();
    let (xa, ya, reports) = PairwiseAligner::new()
        .with_method(DtwMethod::Exact(BandConstraint::Unconstrained))
        .transform_with_report(x.view(), y.view())
        .unwrap();

    assert_eq!(reports[0].path.len(), 8);
    assert_eq!(reports[0].distance.value(), 0.0);
    assert_eq!(xa.dim(), (1, 5, 1));
    assert_eq!(ya.dim(), (1, 5, 1));
    assert_eq!(xa.iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 1.0, 1.0, 9.0]);
    assert_eq!(ya.iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 1.0, 1.0, 9.0]);
}

// ---------------------------------------------------------------------------
// e) single_round_matches_pairwise
// ---------------------------------------------------------------------------

#[test]
fn single_round_matches_pairwise() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut x = random_batch(&mut rng, 3, 16, 2);
    let mut y = random_batch(&mut rng, 3, 16, 2);
    pad_tail(&mut x, 2);
    pad_tail(&mut y, 4);

    let (px, py) = PairwiseAligner::new().transform(x.view(), y.view()).unwrap();
    let (ix, iy) = IterativeAligner::new(1)
        .unwrap()
        .with_gmm_config(small_gmm())
        .transform(x.view(), y.view())
        .unwrap();

    assert_eq!(ix, px);
    assert_eq!(iy, py);
}

// ---------------------------------------------------------------------------
// f) final_outputs_follow_last_round_paths
// ---------------------------------------------------------------------------

/// X_aligned is the original X along the last path; Y_aligned is what the
/// last round wrote and is not re-sliced afterwards.
#[test]
fn final_outputs_follow_last_round_paths() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let mut x = random_batch(&mut rng, 3, 16, 2);
    let mut y = random_batch(&mut rng, 3, 16, 2);
    pad_tail(&mut x, 3);
    pad_tail(&mut y, 1);

    let (xa, ya, report) = IterativeAligner::new(3)
        .unwrap()
        .with_gmm_config(small_gmm())
        .transform_with_report(x.view(), y.view())
        .unwrap();
    assert_eq!(report.lower_bounds.len(), 3);

    for (item, pair) in report.pairs.iter().enumerate() {
        let rows = pair.path.len().min(16);
        let source = pair.path.source_indices();
        let target = pair.path.target_indices();
        for r in 0..rows {
            assert_eq!(xa.slice(s![item, r, ..]), x.slice(s![item, source[r], ..]));
            assert_eq!(ya.slice(s![item, r, ..]), y.slice(s![item, target[r], ..]));
        }
    }
}

// ---------------------------------------------------------------------------
// g) end_to_end_padded_target
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_padded_target() {
    let x = Array3::from_shape_fn((2, 5, 3), |(i, t, d)| 1.0 + i as f64 + t as f64 * 0.5 + d as f64);
    let mut y = Array3::from_shape_fn((2, 5, 3), |(i, t, d)| 1.2 + i as f64 + t as f64 * 0.6 + d as f64);
    y.slice_mut(s![.., 4, ..]).fill(0.0);

    let (xa, ya, reports) = PairwiseAligner::new()
        .transform_with_report(x.view(), y.view())
        .unwrap();

    assert_eq!(xa.dim(), (2, 5, 3));
    assert_eq!(ya.dim(), (2, 5, 3));
    for (item, report) in reports.iter().enumerate() {
        assert!(report.path.is_monotonic());
        assert!(report.path.len() >= 5);
        assert_eq!(report.target_len, 4);
        if report.path.len() > 5 {
            continue;
        }
        // A five-step path fills the buffer from trimmed frames only.
        assert!(ya.slice(s![item, 4, ..]).iter().any(|v| *v != 0.0));
    }
}
