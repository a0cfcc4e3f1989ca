//! Configuration builder for Gaussian mixture fitting.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::GmmError;
use crate::model::GaussianMixture;

/// Structure of each component's covariance matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceType {
    /// Each component has its own unrestricted covariance matrix.
    #[default]
    Full,
    /// Each component has its own diagonal covariance matrix.
    Diagonal,
}

/// Configuration for fitting a Gaussian mixture with EM.
///
/// Construct via [`GmmConfig::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `max_iter`        | 100     |
/// | `tol`             | 1e-3    |
/// | `reg_covar`       | 1e-6    |
/// | `n_init`          | 1       |
/// | `seed`            | 42      |
/// | `kmeans_max_iter` | 10      |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGmmConfig")]
pub struct GmmConfig {
    pub(crate) n_components: usize,
    pub(crate) covariance_type: CovarianceType,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) reg_covar: f64,
    pub(crate) n_init: usize,
    pub(crate) seed: u64,
    pub(crate) kmeans_max_iter: usize,
}

/// Unvalidated form of [`GmmConfig`] read by serde.
#[derive(Deserialize)]
struct RawGmmConfig {
    n_components: usize,
    covariance_type: CovarianceType,
    max_iter: usize,
    tol: f64,
    reg_covar: f64,
    n_init: usize,
    seed: u64,
    kmeans_max_iter: usize,
}

impl TryFrom<RawGmmConfig> for GmmConfig {
    type Error = GmmError;

    fn try_from(raw: RawGmmConfig) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.n_components, raw.covariance_type)?
            .with_max_iter(raw.max_iter)
            .with_tol(raw.tol)
            .with_reg_covar(raw.reg_covar)
            .with_n_init(raw.n_init)
            .with_seed(raw.seed)
            .with_kmeans_max_iter(raw.kmeans_max_iter))
    }
}

impl GmmConfig {
    /// Create a new configuration with the given component count and covariance structure.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::InvalidComponents`] | `n_components` is zero |
    pub fn new(n_components: usize, covariance_type: CovarianceType) -> Result<Self, GmmError> {
        if n_components == 0 {
            return Err(GmmError::InvalidComponents { n_components });
        }
        Ok(Self {
            n_components,
            covariance_type,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            n_init: 1,
            seed: 42,
            kmeans_max_iter: 10,
        })
    }

    /// Set the maximum number of EM iterations per restart.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance on the change of the mean log-likelihood
    /// lower bound between iterations.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the non-negative value added to every covariance diagonal.
    /// Keeps covariances positive definite on degenerate data.
    #[must_use]
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    /// Set the number of independent restarts. The restart with the highest
    /// lower bound is kept. Zero restarts make [`fit`][Self::fit] fail.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the random seed used for k-means++ initialization and restart seeds.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of Lloyd iterations run after k-means++ seeding.
    #[must_use]
    pub fn with_kmeans_max_iter(mut self, kmeans_max_iter: usize) -> Self {
        self.kmeans_max_iter = kmeans_max_iter;
        self
    }

    /// Return the number of mixture components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Return the covariance structure.
    #[must_use]
    pub fn covariance_type(&self) -> CovarianceType {
        self.covariance_type
    }

    /// Return the maximum number of EM iterations per restart.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the convergence tolerance.
    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Return the covariance regularization.
    #[must_use]
    pub fn reg_covar(&self) -> f64 {
        self.reg_covar
    }

    /// Return the number of independent restarts.
    #[must_use]
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the number of Lloyd iterations run after seeding.
    #[must_use]
    pub fn kmeans_max_iter(&self) -> usize {
        self.kmeans_max_iter
    }

    /// Fit a mixture to the rows of `table`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::NoFeatures`] | `table` has zero columns |
    /// | [`GmmError::TooFewSamples`] | `table` has fewer rows than components |
    /// | [`GmmError::NonFiniteValue`] | `table` holds NaN or infinity |
    /// | [`GmmError::IllDefinedCovariance`] | A component covariance is not positive definite |
    /// | [`GmmError::InvalidParameters`] | `n_init` is zero |
    pub fn fit(&self, table: ArrayView2<'_, f64>) -> Result<GaussianMixture, GmmError> {
        let (n_samples, n_features) = table.dim();
        if n_features == 0 {
            return Err(GmmError::NoFeatures);
        }
        if n_samples < self.n_components {
            return Err(GmmError::TooFewSamples {
                n_samples,
                n_components: self.n_components,
            });
        }
        crate::model::check_finite(table)?;
        crate::em::multi_restart(table, self)
    }
}
