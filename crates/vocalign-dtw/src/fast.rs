//! FastDTW: multi-resolution approximate DTW (Salvador & Chan, 2007).
//!
//! Both sequences are repeatedly halved by averaging adjacent frames until one
//! side is shorter than `radius + 2`. The exact alignment at the coarsest level
//! is projected back up one level at a time, and each level only evaluates the
//! cells within `radius` of the projected path. Time and space are linear in
//! the sequence lengths for a fixed radius.

use ndarray::{Array2, ArrayView2};
use tracing::instrument;

use crate::constraint::SearchWindow;
use crate::distance::{DtwDistance, Euclidean, FrameMetric};
use crate::dtw::{validate_pair, windowed_dtw};
use crate::error::DtwError;
use crate::frames::FrameView;
use crate::path::{WarpingPath, WarpingStep};

/// FastDTW configuration: a frame metric plus the search radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastDtw<M = Euclidean> {
    metric: M,
    radius: usize,
}

impl FastDtw<Euclidean> {
    /// Create a Euclidean FastDTW calculator with the given search radius.
    ///
    /// Radius 1 is the conventional default; larger radii trade speed for a
    /// closer approximation of exact DTW.
    #[must_use]
    pub fn new(radius: usize) -> Self {
        Self {
            metric: Euclidean,
            radius,
        }
    }
}

impl Default for FastDtw<Euclidean> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<M: FrameMetric> FastDtw<M> {
    /// Replace the frame metric, keeping the radius.
    #[must_use]
    pub fn with_metric<N: FrameMetric>(self, metric: N) -> FastDtw<N> {
        FastDtw {
            metric,
            radius: self.radius,
        }
    }

    /// Return the search radius.
    #[must_use]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Return the frame metric.
    #[must_use]
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Approximate the optimal alignment of two frame sequences.
    ///
    /// The returned cost is the exact sum of the metric along the returned
    /// path, which is never cheaper than the exact DTW optimum.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySequence`] | Either sequence has no frames |
    /// | [`DtwError::NonFiniteValue`] | Either sequence holds NaN or infinity |
    /// | [`DtwError::DimensionMismatch`] | The metric rejects the frame widths |
    #[instrument(skip(self, x, y), fields(n = x.nrows(), m = y.nrows(), radius = self.radius))]
    pub fn distance_and_path(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
    ) -> Result<(DtwDistance, WarpingPath), DtwError> {
        let (x, y) = validate_pair(&self.metric, x, y)?;
        let (dist, steps) = self.refine(x, y)?;
        Ok((DtwDistance::new(dist), WarpingPath::new(steps)))
    }

    fn refine(
        &self,
        x: FrameView<'_>,
        y: FrameView<'_>,
    ) -> Result<(f64, Vec<WarpingStep>), DtwError> {
        let min_len = self.radius + 2;
        if x.len() < min_len || y.len() < min_len {
            let window = SearchWindow::full(x.len(), y.len());
            return windowed_dtw(&self.metric, x, y, &window);
        }

        let x_half = reduce_by_half(x.as_array());
        let y_half = reduce_by_half(y.as_array());
        let (_, coarse) = self.refine(
            FrameView::new_unchecked(x_half.view()),
            FrameView::new_unchecked(y_half.view()),
        )?;

        let window = SearchWindow::from_coarse_path(
            &WarpingPath::new(coarse),
            x.len(),
            y.len(),
            self.radius,
        );
        windowed_dtw(&self.metric, x, y, &window)
    }
}

/// Average each pair of adjacent frames. An odd trailing frame is dropped.
fn reduce_by_half(frames: ArrayView2<'_, f64>) -> Array2<f64> {
    let half = frames.nrows() / 2;
    Array2::from_shape_fn((half, frames.ncols()), |(i, k)| {
        (frames[[2 * i, k]] + frames[[2 * i + 1, k]]) / 2.0
    })
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;
    use crate::dtw::Dtw;

    fn sine(n: usize, phase: f64) -> Array2<f64> {
        Array2::from_shape_fn((n, 2), |(i, k)| {
            ((i as f64) * 0.3 + phase + k as f64).sin()
        })
    }

    #[test]
    fn reduce_by_half_averages_pairs() {
        let a = array![[0.0], [2.0], [4.0], [6.0], [100.0]];
        let half = reduce_by_half(a.view());
        assert_eq!(half, array![[1.0], [5.0]]);
    }

    #[test]
    fn short_sequences_fall_back_to_exact() {
        let a = array![[1.0], [2.0]];
        let b = array![[1.0], [3.0], [2.0]];
        let (fast, fast_path) = FastDtw::new(1).distance_and_path(a.view(), b.view()).unwrap();
        let (exact, exact_path) = Dtw::unconstrained()
            .distance_and_path(a.view(), b.view())
            .unwrap();
        assert!((fast.value() - exact.value()).abs() < 1e-12);
        assert_eq!(fast_path, exact_path);
    }

    #[test]
    fn large_radius_matches_exact() {
        let a = sine(40, 0.0);
        let b = sine(31, 0.4);
        let (fast, _) = FastDtw::new(64).distance_and_path(a.view(), b.view()).unwrap();
        let (exact, _) = Dtw::unconstrained()
            .distance_and_path(a.view(), b.view())
            .unwrap();
        assert!((fast.value() - exact.value()).abs() < 1e-9);
    }

    #[test]
    fn approximation_is_never_cheaper_than_exact() {
        for (n, m) in [(17, 23), (64, 50), (33, 33)] {
            let a = sine(n, 0.0);
            let b = sine(m, 1.1);
            let (fast, path) = FastDtw::new(1).distance_and_path(a.view(), b.view()).unwrap();
            let (exact, _) = Dtw::unconstrained()
                .distance_and_path(a.view(), b.view())
                .unwrap();
            assert!(fast.value() >= exact.value() - 1e-9);
            assert!(path.is_monotonic());
            assert_eq!(path.steps().first(), Some(&WarpingStep { a: 0, b: 0 }));
            assert_eq!(path.steps().last(), Some(&WarpingStep { a: n - 1, b: m - 1 }));
        }
    }

    #[test]
    fn identical_sequences_give_diagonal() {
        let a = sine(25, 0.0);
        let (dist, path) = FastDtw::default().distance_and_path(a.view(), a.view()).unwrap();
        assert!(dist.value().abs() < 1e-12);
        assert_eq!(path.source_indices(), (0..25).collect::<Vec<_>>());
        assert_eq!(path.target_indices(), (0..25).collect::<Vec<_>>());
    }
}
