//! Cholesky-factored covariance for multivariate normal densities.

use std::f64::consts::PI;

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Lower Cholesky factor `L` of a covariance `Σ = L Lᵀ`, with its log-determinant.
#[derive(Debug, Clone)]
pub(crate) struct CholeskyCovariance {
    lower: DMatrix<f64>,
    log_det: f64,
}

impl CholeskyCovariance {
    /// Factor `cov`. Returns `None` when it is not symmetric positive definite.
    pub(crate) fn factor(cov: ArrayView2<'_, f64>) -> Option<Self> {
        let d = cov.nrows();
        let matrix = DMatrix::from_fn(d, d, |i, j| cov[[i, j]]);
        let lower = matrix.cholesky()?.unpack();
        let log_det = 2.0 * lower.diagonal().iter().map(|v| v.ln()).sum::<f64>();
        if !log_det.is_finite() {
            return None;
        }
        Some(Self { lower, log_det })
    }

    /// Log-density of `x` under `N(mean, Σ)`.
    pub(crate) fn log_density(&self, x: ArrayView1<'_, f64>, mean: ArrayView1<'_, f64>) -> f64 {
        let d = x.len();
        // Forward substitution: L z = x - mean, so |z|² is the Mahalanobis term.
        let mut z = vec![0.0; d];
        let mut maha = 0.0;
        for i in 0..d {
            let mut acc = x[i] - mean[i];
            for (k, zk) in z.iter().enumerate().take(i) {
                acc -= self.lower[(i, k)] * zk;
            }
            z[i] = acc / self.lower[(i, i)];
            maha += z[i] * z[i];
        }
        -0.5 * (d as f64 * (2.0 * PI).ln() + self.log_det + maha)
    }

    /// Solve `Σ X = rhs` for `X`. Returns `None` when the factor has a zero
    /// on its diagonal.
    pub(crate) fn solve(&self, rhs: ArrayView2<'_, f64>) -> Option<Array2<f64>> {
        let (rows, cols) = rhs.dim();
        let b = DMatrix::from_fn(rows, cols, |i, j| rhs[[i, j]]);
        let y = self
            .lower
            .solve_lower_triangular(&b)
            .and_then(|y| self.lower.tr_solve_lower_triangular(&y))?;
        Some(Array2::from_shape_fn((rows, cols), |(i, j)| y[(i, j)]))
    }
}

/// `log Σ_k exp(values_k)`, shifted by the maximum to avoid overflow.
pub(crate) fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
