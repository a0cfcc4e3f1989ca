//! Exact DTW alignment over a band-constrained cost matrix.

use ndarray::ArrayView2;
use tracing::instrument;

use crate::constraint::{BandConstraint, SearchWindow};
use crate::distance::{DtwDistance, Euclidean, FrameMetric};
use crate::error::{DtwError, Side};
use crate::frames::FrameView;
use crate::path::{WarpingPath, WarpingStep};

/// DTW configuration: a frame metric plus a band constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dtw<M = Euclidean> {
    metric: M,
    constraint: BandConstraint,
}

impl Dtw<Euclidean> {
    /// Create an unconstrained Euclidean DTW calculator.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::new(Euclidean, BandConstraint::Unconstrained)
    }

    /// Create a Euclidean DTW calculator with a Sakoe-Chiba band constraint.
    #[must_use]
    pub fn with_sakoe_chiba(radius: usize) -> Self {
        Self::new(Euclidean, BandConstraint::SakoeChibaRadius(radius))
    }
}

impl<M: FrameMetric> Dtw<M> {
    /// Create a DTW calculator from a metric and a band constraint.
    #[must_use]
    pub fn new(metric: M, constraint: BandConstraint) -> Self {
        Self { metric, constraint }
    }

    /// Replace the frame metric, keeping the band constraint.
    #[must_use]
    pub fn with_metric<N: FrameMetric>(self, metric: N) -> Dtw<N> {
        Dtw {
            metric,
            constraint: self.constraint,
        }
    }

    /// Return the band constraint configuration.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Return the frame metric.
    #[must_use]
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Align two frame sequences, returning the accumulated cost and the
    /// optimal warping path.
    ///
    /// The cost of a path is the sum of the metric over its cells. Runs in
    /// O(n * bw) time and space, where `bw` is the band width (`m` when
    /// unconstrained).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySequence`] | Either sequence has no frames |
    /// | [`DtwError::NonFiniteValue`] | Either sequence holds NaN or infinity |
    /// | [`DtwError::DimensionMismatch`] | The metric rejects the frame widths |
    /// | [`DtwError::Unreachable`] | The band excludes the final cell |
    #[instrument(skip(self, x, y), fields(n = x.nrows(), m = y.nrows()))]
    pub fn distance_and_path(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
    ) -> Result<(DtwDistance, WarpingPath), DtwError> {
        let (x, y) = validate_pair(&self.metric, x, y)?;
        let window = SearchWindow::from_band(self.constraint, x.len(), y.len());
        let (dist, steps) = windowed_dtw(&self.metric, x, y, &window)?;
        Ok((DtwDistance::new(dist), WarpingPath::new(steps)))
    }
}

/// Validate both sides of an alignment against each other and the metric.
pub(crate) fn validate_pair<'a, 'b, M: FrameMetric>(
    metric: &M,
    x: ArrayView2<'a, f64>,
    y: ArrayView2<'b, f64>,
) -> Result<(FrameView<'a>, FrameView<'b>), DtwError> {
    let x = FrameView::new(x, Side::Source)?;
    let y = FrameView::new(y, Side::Target)?;
    if !metric.accepts(x.dim(), y.dim()) {
        return Err(DtwError::DimensionMismatch {
            source_dim: x.dim(),
            target_dim: y.dim(),
        });
    }
    Ok((x, y))
}

/// DTW restricted to the cells of `window`, with traceback.
///
/// Cell `(i, j)` lives at flat index `offsets[i] + (j - window.row(i).start)`.
/// Direction bytes: 0 = diagonal, 1 = above, 2 = left. Ties prefer the
/// diagonal, then above, then left.
pub(crate) fn windowed_dtw<M: FrameMetric>(
    metric: &M,
    x: FrameView<'_>,
    y: FrameView<'_>,
    window: &SearchWindow,
) -> Result<(f64, Vec<WarpingStep>), DtwError> {
    let n = x.len();
    let m = y.len();
    debug_assert_eq!(window.n_rows(), n);
    debug_assert_eq!(window.n_cols(), m);

    let mut offsets = Vec::with_capacity(n + 1);
    offsets.push(0usize);
    for i in 0..n {
        offsets.push(offsets[i] + window.row(i).len());
    }
    let cell = |i: usize, j: usize| -> Option<usize> {
        let range = window.row(i);
        range.contains(&j).then(|| offsets[i] + (j - range.start))
    };

    let mut cost = vec![f64::INFINITY; offsets[n]];
    let mut dirs = vec![0u8; offsets[n]];

    for i in 0..n {
        let range = window.row(i);
        let xi = x.frame(i);
        for j in range.clone() {
            let c = metric.distance(xi, y.frame(j));
            let idx = offsets[i] + (j - range.start);

            if i == 0 && j == 0 {
                cost[idx] = c;
                continue;
            }

            let diag = if i > 0 && j > 0 {
                cell(i - 1, j - 1).map_or(f64::INFINITY, |p| cost[p])
            } else {
                f64::INFINITY
            };
            let above = if i > 0 {
                cell(i - 1, j).map_or(f64::INFINITY, |p| cost[p])
            } else {
                f64::INFINITY
            };
            let left = if j > range.start {
                cost[idx - 1]
            } else {
                f64::INFINITY
            };

            let (min_val, dir) = if diag <= above && diag <= left {
                (diag, 0u8)
            } else if above <= left {
                (above, 1u8)
            } else {
                (left, 2u8)
            };

            cost[idx] = c + min_val;
            dirs[idx] = dir;
        }
    }

    let final_idx = match cell(n - 1, m - 1) {
        Some(idx) if cost[idx].is_finite() => idx,
        _ => {
            return Err(DtwError::Unreachable {
                rows: n - 1,
                cols: m - 1,
            });
        }
    };
    let dist = cost[final_idx];

    // Traceback from (n-1, m-1) to (0, 0).
    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    loop {
        path.push(WarpingStep { a: i, b: j });
        if i == 0 && j == 0 {
            break;
        }
        let idx = cell(i, j).ok_or(DtwError::Unreachable {
            rows: n - 1,
            cols: m - 1,
        })?;
        match dirs[idx] {
            0 => {
                i -= 1;
                j -= 1;
            }
            1 => i -= 1,
            2 => j -= 1,
            _ => unreachable!("invalid direction byte"),
        }
    }
    path.reverse();

    Ok((dist, path))
}
