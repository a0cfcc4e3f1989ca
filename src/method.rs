//! Choice of DTW search used by the aligners.

use ndarray::ArrayView2;
use vocalign_dtw::{BandConstraint, Dtw, DtwDistance, DtwError, FastDtw, FrameMetric, WarpingPath};

/// DTW search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtwMethod {
    /// Multi-resolution approximate DTW with the given window expansion radius.
    Fast {
        /// Cells added around the projected coarse path at each resolution.
        radius: usize,
    },
    /// Exact DTW under a band constraint.
    Exact(BandConstraint),
}

impl Default for DtwMethod {
    fn default() -> Self {
        Self::Fast { radius: 1 }
    }
}

impl DtwMethod {
    /// Align `x` against `y` under `metric`.
    ///
    /// # Errors
    ///
    /// Propagates [`DtwError`] from the chosen search.
    pub(crate) fn align<M: FrameMetric + Clone>(
        self,
        metric: &M,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
    ) -> Result<(DtwDistance, WarpingPath), DtwError> {
        match self {
            Self::Fast { radius } => FastDtw::new(radius)
                .with_metric(metric.clone())
                .distance_and_path(x, y),
            Self::Exact(constraint) => Dtw::new(metric.clone(), constraint).distance_and_path(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use vocalign_dtw::Euclidean;

    use super::*;

    #[test]
    fn default_is_fast_radius_one() {
        assert_eq!(DtwMethod::default(), DtwMethod::Fast { radius: 1 });
    }

    #[test]
    fn fast_never_beats_exact() {
        let x = array![[0.0], [1.0], [2.0], [2.0], [3.0]];
        let y = array![[0.0], [1.0], [2.0], [3.0]];
        let (fast, _) = DtwMethod::default().align(&Euclidean, x.view(), y.view()).unwrap();
        let (exact, _) = DtwMethod::Exact(BandConstraint::Unconstrained)
            .align(&Euclidean, x.view(), y.view())
            .unwrap();
        assert_eq!(exact.value(), 0.0);
        assert!(fast.value() >= exact.value());
    }
}
