//! Iterative refinement alignment: DTW alternated with joint-model regression.

use ndarray::{Array2, Array3, ArrayView3, ArrayViewD, Axis, s};
use rayon::prelude::*;
use tracing::{debug, info, instrument};
use vocalign_dtw::{Euclidean, FrameMetric, Side, trim_zero_frames};
use vocalign_gmm::{CovarianceType, GmmConfig, LogLikelihood, MlParameterGeneration};

use crate::batch::{PairReport, align_items, as_batch, check_batch_sizes, write_items, write_truncated};
use crate::error::AlignError;
use crate::method::DtwMethod;

const DEFAULT_N_ITER: usize = 3;
const DEFAULT_COMPONENTS: usize = 32;
const DEFAULT_GMM_MAX_ITER: usize = 100;

/// Diagnostics from an iterative alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct IterativeReport {
    /// Per-item reports from the last round.
    pub pairs: Vec<PairReport>,
    /// Mean log-likelihood of each round's joint mixture on its training table.
    pub lower_bounds: Vec<LogLikelihood>,
}

/// Aligns batches by alternating DTW with a joint Gaussian mixture.
///
/// Each round aligns a working copy of X against Y, fits a mixture on the
/// stacked `[X_aligned, Y_aligned]` frames, and replaces the working copy of
/// every item with its regression onto the Y side. The final X_aligned is the
/// original X re-indexed by the last round's path; Y_aligned is what the last
/// round wrote.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `n_iter`  | 3 |
/// | `metric`  | [`Euclidean`] |
/// | `method`  | `DtwMethod::Fast { radius: 1 }` |
/// | `verbose` | 0 |
/// | `gmm`     | 32 components, full covariance, `max_iter` 100 |
#[derive(Debug, Clone)]
pub struct IterativeAligner<M = Euclidean> {
    n_iter: usize,
    metric: M,
    method: DtwMethod,
    verbose: u8,
    gmm: GmmConfig,
}

impl IterativeAligner<Euclidean> {
    /// Create an aligner running `n_iter` refinement rounds.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::InvalidIterations`] | `n_iter` is zero |
    pub fn new(n_iter: usize) -> Result<Self, AlignError> {
        if n_iter == 0 {
            return Err(AlignError::InvalidIterations { n_iter });
        }
        let gmm = GmmConfig::new(DEFAULT_COMPONENTS, CovarianceType::Full)
            .map_err(|source| AlignError::Gmm { round: 0, source })?
            .with_max_iter(DEFAULT_GMM_MAX_ITER);
        Ok(Self {
            n_iter,
            metric: Euclidean,
            method: DtwMethod::default(),
            verbose: 0,
            gmm,
        })
    }

    /// Create an aligner with three refinement rounds.
    ///
    /// # Errors
    ///
    /// As [`new`][Self::new]; never fails in practice.
    pub fn with_defaults() -> Result<Self, AlignError> {
        Self::new(DEFAULT_N_ITER)
    }
}

impl<M: FrameMetric + Clone> IterativeAligner<M> {
    /// Replace the frame metric.
    #[must_use]
    pub fn with_metric<N: FrameMetric + Clone>(self, metric: N) -> IterativeAligner<N> {
        IterativeAligner {
            n_iter: self.n_iter,
            metric,
            method: self.method,
            verbose: self.verbose,
            gmm: self.gmm,
        }
    }

    /// Set the DTW search strategy.
    #[must_use]
    pub fn with_method(mut self, method: DtwMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the verbosity. Above zero, every item's normalized distance is
    /// logged at `info` level in every round.
    #[must_use]
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Replace the mixture configuration used in every round.
    #[must_use]
    pub fn with_gmm_config(mut self, gmm: GmmConfig) -> Self {
        self.gmm = gmm;
        self
    }

    /// Return the number of refinement rounds.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Return the frame metric.
    #[must_use]
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Return the DTW search strategy.
    #[must_use]
    pub fn method(&self) -> DtwMethod {
        self.method
    }

    /// Return the verbosity.
    #[must_use]
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Return the mixture configuration.
    #[must_use]
    pub fn gmm_config(&self) -> &GmmConfig {
        &self.gmm
    }

    /// Align two batches of shape `(N, T, D)`.
    ///
    /// Returns `(X_aligned, Y_aligned)` with the shapes of `x` and `y`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::BatchSizeMismatch`] | `x` and `y` hold different numbers of items |
    /// | [`AlignError::FeatureDimMismatch`] | `x` and `y` have different feature widths |
    /// | [`AlignError::FrameCountMismatch`] | `x` and `y` have different padded lengths |
    /// | [`AlignError::EmptySequence`] | An item is entirely zero padding |
    /// | [`AlignError::Dtw`] | DTW fails on an item |
    /// | [`AlignError::Gmm`] | Fitting or applying a round's mixture fails |
    pub fn transform(
        &self,
        x: ArrayView3<'_, f64>,
        y: ArrayView3<'_, f64>,
    ) -> Result<(Array3<f64>, Array3<f64>), AlignError> {
        let (x_aligned, y_aligned, _) = self.transform_with_report(x, y)?;
        Ok((x_aligned, y_aligned))
    }

    /// Align two batches of any rank, rejecting anything but rank 3.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::InvalidRank`] | Either batch does not have three axes |
    ///
    /// Otherwise as [`transform`][Self::transform].
    pub fn transform_dyn(
        &self,
        x: ArrayViewD<'_, f64>,
        y: ArrayViewD<'_, f64>,
    ) -> Result<(Array3<f64>, Array3<f64>), AlignError> {
        let x = as_batch(x, Side::Source)?;
        let y = as_batch(y, Side::Target)?;
        self.transform(x, y)
    }

    /// Align two batches and also return the last round's per-item reports
    /// and every round's mixture lower bound.
    ///
    /// # Errors
    ///
    /// As [`transform`][Self::transform].
    #[instrument(
        skip(self, x, y),
        fields(n = x.len_of(Axis(0)), n_iter = self.n_iter, k = self.gmm.n_components())
    )]
    pub fn transform_with_report(
        &self,
        x: ArrayView3<'_, f64>,
        y: ArrayView3<'_, f64>,
    ) -> Result<(Array3<f64>, Array3<f64>, IterativeReport), AlignError> {
        let n = check_batch_sizes(x, y)?;
        let (_, t_max, dim) = x.dim();
        let (_, target_frames, target_dim) = y.dim();
        if dim != target_dim {
            return Err(AlignError::FeatureDimMismatch {
                source_dim: dim,
                target_dim,
            });
        }
        if t_max != target_frames {
            return Err(AlignError::FrameCountMismatch {
                source_frames: t_max,
                target_frames,
            });
        }

        let mut xc = x.to_owned();
        // Allocated once; rows past a shorter path keep earlier rounds' values.
        let mut x_aligned = Array3::<f64>::zeros(x.raw_dim());
        let mut y_aligned = Array3::<f64>::zeros(y.raw_dim());
        let mut refined_paths: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pairs = Vec::new();
        let mut lower_bounds = Vec::with_capacity(self.n_iter);

        for round in 0..self.n_iter {
            let items = align_items(self.method, &self.metric, self.verbose, xc.view(), y)?;
            write_items(&mut x_aligned, &mut y_aligned, &items);
            for (path, item) in refined_paths.iter_mut().zip(&items) {
                *path = item.report.path.source_indices();
            }
            pairs = items.into_iter().map(|item| item.report).collect();

            let table = joint_table(&x_aligned, &y_aligned);
            let gmm = self
                .gmm
                .fit(table.view())
                .map_err(|source| AlignError::Gmm { round, source })?;
            let mlpg = MlParameterGeneration::new(&gmm, dim)
                .map_err(|source| AlignError::Gmm { round, source })?;
            lower_bounds.push(gmm.lower_bound());

            let regressed: Vec<Array2<f64>> = (0..n)
                .into_par_iter()
                .map(|item| {
                    let current = trim_zero_frames(xc.index_axis(Axis(0), item));
                    mlpg.transform(current)
                        .map_err(|source| AlignError::Gmm { round, source })
                })
                .collect::<Result<_, _>>()?;
            for (item, rows) in regressed.iter().enumerate() {
                write_truncated(xc.index_axis_mut(Axis(0), item), rows.view());
            }

            info!(
                round,
                lower_bound = gmm.lower_bound().value(),
                converged = gmm.converged(),
                "refinement round complete"
            );
        }

        for (item, path) in refined_paths.iter().enumerate() {
            let rows = x.index_axis(Axis(0), item).select(Axis(0), path);
            write_truncated(x_aligned.index_axis_mut(Axis(0), item), rows.view());
        }
        debug!("original source re-sliced with final paths");

        Ok((x_aligned, y_aligned, IterativeReport { pairs, lower_bounds }))
    }
}

/// Stack both aligned batches on the feature axis and flatten batch and time.
fn joint_table(x_aligned: &Array3<f64>, y_aligned: &Array3<f64>) -> Array2<f64> {
    let (n, t, dx) = x_aligned.dim();
    let dy = y_aligned.len_of(Axis(2));
    let mut table = Array2::<f64>::zeros((n * t, dx + dy));
    for item in 0..n {
        let rows = item * t..(item + 1) * t;
        table
            .slice_mut(s![rows.clone(), ..dx])
            .assign(&x_aligned.index_axis(Axis(0), item));
        table
            .slice_mut(s![rows, dx..])
            .assign(&y_aligned.index_axis(Axis(0), item));
    }
    table
}
