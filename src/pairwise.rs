//! Single-pass DTW alignment of a batch of sequence pairs.

use ndarray::{Array3, ArrayView3, ArrayViewD};
use tracing::{info, instrument};
use vocalign_dtw::{Euclidean, FrameMetric, Side};

use crate::batch::{PairReport, align_items, as_batch, check_batch_sizes, write_items};
use crate::error::AlignError;
use crate::method::DtwMethod;

/// Aligns every `(X[i], Y[i])` pair with one DTW pass.
///
/// Each item is trimmed of trailing zero frames, aligned, and both sides are
/// re-indexed along the warping path into zero buffers shaped like the
/// inputs. Aligned frames past the padded length are dropped.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `metric`  | [`Euclidean`] |
/// | `method`  | `DtwMethod::Fast { radius: 1 }` |
/// | `verbose` | 0 |
#[derive(Debug, Clone, Default)]
pub struct PairwiseAligner<M = Euclidean> {
    metric: M,
    method: DtwMethod,
    verbose: u8,
}

impl PairwiseAligner<Euclidean> {
    /// Create an aligner with the default metric, method and verbosity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: FrameMetric + Clone> PairwiseAligner<M> {
    /// Replace the frame metric.
    #[must_use]
    pub fn with_metric<N: FrameMetric + Clone>(self, metric: N) -> PairwiseAligner<N> {
        PairwiseAligner {
            metric,
            method: self.method,
            verbose: self.verbose,
        }
    }

    /// Set the DTW search strategy.
    #[must_use]
    pub fn with_method(mut self, method: DtwMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the verbosity. Above zero, every item's normalized distance is
    /// logged at `info` level.
    #[must_use]
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
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

    /// Align two batches of shape `(N, T, D)`.
    ///
    /// Returns `(X_aligned, Y_aligned)` with the shapes of `x` and `y`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`AlignError::BatchSizeMismatch`] | `x` and `y` hold different numbers of items |
    /// | [`AlignError::EmptySequence`] | An item is entirely zero padding |
    /// | [`AlignError::Dtw`] | DTW fails on an item |
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

    /// Align two batches and also return one [`PairReport`] per item.
    ///
    /// # Errors
    ///
    /// As [`transform`][Self::transform].
    #[instrument(skip(self, x, y), fields(n = x.len_of(ndarray::Axis(0)), method = ?self.method))]
    pub fn transform_with_report(
        &self,
        x: ArrayView3<'_, f64>,
        y: ArrayView3<'_, f64>,
    ) -> Result<(Array3<f64>, Array3<f64>, Vec<PairReport>), AlignError> {
        check_batch_sizes(x, y)?;
        let items = align_items(self.method, &self.metric, self.verbose, x, y)?;

        let mut x_aligned = Array3::<f64>::zeros(x.raw_dim());
        let mut y_aligned = Array3::<f64>::zeros(y.raw_dim());
        write_items(&mut x_aligned, &mut y_aligned, &items);

        let reports: Vec<PairReport> = items.into_iter().map(|item| item.report).collect();
        if !reports.is_empty() {
            let mean = reports.iter().map(|r| r.normalized_distance).sum::<f64>() / reports.len() as f64;
            info!(items = reports.len(), mean_normalized_distance = mean, "batch aligned");
        }
        Ok((x_aligned, y_aligned, reports))
    }
}
