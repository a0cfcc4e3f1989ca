//! Fitted Gaussian mixture model and its density queries.

use std::ops::Range;

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, s};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CovarianceType;
use crate::error::GmmError;
use crate::gaussian::{CholeskyCovariance, log_sum_exp};
use crate::label::ComponentLabel;
use crate::likelihood::LogLikelihood;

/// Tolerance on `|Σ weights - 1|` accepted by [`GaussianMixture::from_params`].
const WEIGHT_SUM_TOL: f64 = 1e-6;

/// Plain-data form of a mixture, used for (de)serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MixtureParams {
    weights: Array1<f64>,
    means: Array2<f64>,
    covariances: Array3<f64>,
    covariance_type: CovarianceType,
    converged: bool,
    n_iter: usize,
    lower_bound: LogLikelihood,
}

/// A fitted mixture of `K` multivariate normals over `D` features.
///
/// Covariances are always stored as full `D x D` matrices; diagonal models
/// simply have zero off-diagonal entries. Cholesky factors are computed once
/// at construction and reused by every density query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MixtureParams", into = "MixtureParams")]
pub struct GaussianMixture {
    params: MixtureParams,
    log_weights: Vec<f64>,
    factors: Vec<CholeskyCovariance>,
}

impl GaussianMixture {
    /// Build a mixture from explicit parameters.
    ///
    /// `weights` has shape `(K,)`, `means` `(K, D)` and `covariances` `(K, D, D)`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::InvalidParameters`] | Shapes disagree, or weights are negative or do not sum to one |
    /// | [`GmmError::IllDefinedCovariance`] | A covariance is not positive definite |
    pub fn from_params(
        weights: Array1<f64>,
        means: Array2<f64>,
        covariances: Array3<f64>,
        covariance_type: CovarianceType,
    ) -> Result<Self, GmmError> {
        Self::try_from(MixtureParams {
            weights,
            means,
            covariances,
            covariance_type,
            converged: false,
            n_iter: 0,
            lower_bound: LogLikelihood::new(f64::NEG_INFINITY),
        })
    }

    /// Attach EM bookkeeping to a freshly estimated mixture.
    pub(crate) fn with_fit_metadata(
        mut self,
        converged: bool,
        n_iter: usize,
        lower_bound: LogLikelihood,
    ) -> Self {
        self.params.converged = converged;
        self.params.n_iter = n_iter;
        self.params.lower_bound = lower_bound;
        self
    }

    /// Return the number of mixture components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.params.weights.len()
    }

    /// Return the feature dimension.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.params.means.ncols()
    }

    /// Return the mixing weights, shape `(K,)`.
    #[must_use]
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.params.weights.view()
    }

    /// Return the component means, shape `(K, D)`.
    #[must_use]
    pub fn means(&self) -> ArrayView2<'_, f64> {
        self.params.means.view()
    }

    /// Return the component covariances, shape `(K, D, D)`.
    #[must_use]
    pub fn covariances(&self) -> ndarray::ArrayView3<'_, f64> {
        self.params.covariances.view()
    }

    /// Return the covariance structure the mixture was fitted with.
    #[must_use]
    pub fn covariance_type(&self) -> CovarianceType {
        self.params.covariance_type
    }

    /// Return whether EM reached the tolerance before `max_iter`.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.params.converged
    }

    /// Return the number of EM iterations of the retained restart.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.params.n_iter
    }

    /// Return the final mean log-likelihood of the training table.
    #[must_use]
    pub fn lower_bound(&self) -> LogLikelihood {
        self.params.lower_bound
    }

    /// `log π_k + log N(x | μ_k, Σ_k)` for every component.
    pub(crate) fn weighted_log_prob(&self, x: ArrayView1<'_, f64>) -> Vec<f64> {
        self.factors
            .iter()
            .zip(&self.log_weights)
            .enumerate()
            .map(|(k, (factor, log_w))| log_w + factor.log_density(x, self.params.means.row(k)))
            .collect()
    }

    /// Normalized component posteriors `p(k | x)` and the log-density `log p(x)`.
    pub(crate) fn posterior(&self, x: ArrayView1<'_, f64>) -> (Vec<f64>, f64) {
        let mut weighted = self.weighted_log_prob(x);
        let log_norm = log_sum_exp(&weighted);
        for w in &mut weighted {
            *w = (*w - log_norm).exp();
        }
        (weighted, log_norm)
    }

    /// Log-density `log p(x)` of every row of `table`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::DimensionMismatch`] | `table` width differs from the model's |
    /// | [`GmmError::NonFiniteValue`] | `table` holds NaN or infinity |
    pub fn score_samples(&self, table: ArrayView2<'_, f64>) -> Result<Array1<f64>, GmmError> {
        self.check_input(table)?;
        let scores: Vec<f64> = (0..table.nrows())
            .into_par_iter()
            .map(|i| log_sum_exp(&self.weighted_log_prob(table.row(i))))
            .collect();
        Ok(Array1::from(scores))
    }

    /// Mean log-density of the rows of `table`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`score_samples`][Self::score_samples].
    pub fn score(&self, table: ArrayView2<'_, f64>) -> Result<LogLikelihood, GmmError> {
        let scores = self.score_samples(table)?;
        Ok(LogLikelihood::new(scores.mean().unwrap_or(f64::NEG_INFINITY)))
    }

    /// Component posteriors `p(k | x)` for every row, shape `(N, K)`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`score_samples`][Self::score_samples].
    pub fn predict_proba(&self, table: ArrayView2<'_, f64>) -> Result<Array2<f64>, GmmError> {
        self.check_input(table)?;
        let rows: Vec<Vec<f64>> = (0..table.nrows())
            .into_par_iter()
            .map(|i| self.posterior(table.row(i)).0)
            .collect();
        let k = self.n_components();
        Ok(Array2::from_shape_fn((rows.len(), k), |(i, j)| rows[i][j]))
    }

    /// Most probable component for every row.
    ///
    /// # Errors
    ///
    /// Same conditions as [`score_samples`][Self::score_samples].
    pub fn predict(&self, table: ArrayView2<'_, f64>) -> Result<Vec<ComponentLabel>, GmmError> {
        let proba = self.predict_proba(table)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map_or(0, |(k, _)| k);
                ComponentLabel::new(best)
            })
            .collect())
    }

    /// Marginal mixture over the contiguous feature block `dims`.
    ///
    /// Weights are unchanged; means and covariances are restricted to the
    /// block. Fit metadata is carried over from the joint model.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::InvalidParameters`] | `dims` is empty or exceeds the feature dimension |
    pub fn marginal(&self, dims: Range<usize>) -> Result<GaussianMixture, GmmError> {
        if dims.is_empty() || dims.end > self.n_features() {
            return Err(GmmError::InvalidParameters {
                reason: format!(
                    "marginal block {dims:?} is not a non-empty range within 0..{}",
                    self.n_features()
                ),
            });
        }
        let params = MixtureParams {
            weights: self.params.weights.clone(),
            means: self.params.means.slice(s![.., dims.clone()]).to_owned(),
            covariances: self
                .params
                .covariances
                .slice(s![.., dims.clone(), dims])
                .to_owned(),
            ..self.params.clone()
        };
        Self::try_from(params)
    }

    fn check_input(&self, table: ArrayView2<'_, f64>) -> Result<(), GmmError> {
        if table.ncols() != self.n_features() {
            return Err(GmmError::DimensionMismatch {
                expected: self.n_features(),
                got: table.ncols(),
            });
        }
        check_finite(table)
    }
}

impl TryFrom<MixtureParams> for GaussianMixture {
    type Error = GmmError;

    fn try_from(params: MixtureParams) -> Result<Self, Self::Error> {
        let k = params.weights.len();
        let (mk, d) = params.means.dim();
        let (ck, cd1, cd2) = params.covariances.dim();
        if k == 0 || d == 0 || mk != k || ck != k || cd1 != d || cd2 != d {
            return Err(GmmError::InvalidParameters {
                reason: format!(
                    "weights ({k},), means ({mk}, {d}) and covariances ({ck}, {cd1}, {cd2}) disagree"
                ),
            });
        }
        if params.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(GmmError::InvalidParameters {
                reason: "weights must be finite and non-negative".to_owned(),
            });
        }
        let total: f64 = params.weights.sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(GmmError::InvalidParameters {
                reason: format!("weights sum to {total}, expected 1"),
            });
        }

        let factors = params
            .covariances
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(component, cov)| {
                CholeskyCovariance::factor(cov)
                    .ok_or(GmmError::IllDefinedCovariance { component })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let log_weights = params.weights.iter().map(|w| w.ln()).collect();

        Ok(Self {
            params,
            log_weights,
            factors,
        })
    }
}

impl From<GaussianMixture> for MixtureParams {
    fn from(model: GaussianMixture) -> Self {
        model.params
    }
}

/// Reject tables holding NaN or infinity.
pub(crate) fn check_finite(table: ArrayView2<'_, f64>) -> Result<(), GmmError> {
    for (row, values) in table.axis_iter(Axis(0)).enumerate() {
        if let Some(col) = values.iter().position(|v| !v.is_finite()) {
            return Err(GmmError::NonFiniteValue { row, col });
        }
    }
    Ok(())
}
