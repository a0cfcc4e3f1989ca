//! Frame metrics and the accumulated DTW distance newtype.

use std::cmp::Ordering;
use std::fmt;

use ndarray::ArrayView1;

/// Pointwise distance between two feature frames.
///
/// Implemented by the built-in [`Euclidean`], [`SquaredEuclidean`] and
/// [`Manhattan`] metrics, and by any `Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64`
/// closure that is `Sync`.
pub trait FrameMetric: Sync {
    /// Distance between frame `a` of the source and frame `b` of the target.
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64;

    /// Whether frames of width `source_dim` and `target_dim` can be compared.
    ///
    /// Built-in metrics require equal widths.
    fn accepts(&self, source_dim: usize, target_dim: usize) -> bool {
        source_dim == target_dim
    }
}

impl<F> FrameMetric for F
where
    F: Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> f64 + Sync,
{
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        self(a, b)
    }

    // Custom closures decide for themselves how mismatched widths compare.
    fn accepts(&self, _source_dim: usize, _target_dim: usize) -> bool {
        true
    }
}

/// Euclidean norm of the frame difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl FrameMetric for Euclidean {
    #[inline]
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        SquaredEuclidean.distance(a, b).sqrt()
    }
}

/// Squared Euclidean distance. Cheaper, but penalises outlier frames harder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl FrameMetric for SquaredEuclidean {
    #[inline]
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}

/// Sum of absolute per-dimension differences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl FrameMetric for Manhattan {
    #[inline]
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
    }
}

/// A non-negative accumulated DTW cost: the sum of frame distances along the path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DtwDistance(f64);

impl DtwDistance {
    /// Create a new DTW distance from a raw value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Distance divided by the combined frame count of both sequences.
    ///
    /// Makes costs comparable across pairs of different lengths.
    #[must_use]
    pub fn normalized(self, source_len: usize, target_len: usize) -> f64 {
        self.0 / (source_len + target_len) as f64
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for DtwDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn euclidean_is_norm_of_difference() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((Euclidean.distance(a.view(), b.view()) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn squared_and_manhattan() {
        let a = array![1.0, -1.0, 2.0];
        let b = array![0.0, 1.0, 2.0];
        assert!((SquaredEuclidean.distance(a.view(), b.view()) - 5.0).abs() < 1e-12);
        assert!((Manhattan.distance(a.view(), b.view()) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn closures_are_metrics() {
        let first_dim_only = |a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>| (a[0] - b[0]).abs();
        let a = array![1.0, 100.0];
        let b = array![4.0];
        assert!(first_dim_only.accepts(2, 1));
        assert!((first_dim_only.distance(a.view(), b.view()) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn builtin_metrics_reject_mismatched_dims() {
        assert!(!Euclidean.accepts(3, 2));
        assert!(Manhattan.accepts(4, 4));
    }

    #[test]
    fn normalized_divides_by_total_length() {
        let d = DtwDistance::new(9.0);
        assert!((d.normalized(5, 4) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn display_format() {
        let d = DtwDistance::new(1.234567);
        assert_eq!(format!("{d}"), "1.234567");
    }

    #[test]
    fn total_cmp_ordering() {
        let a = DtwDistance::new(1.0);
        let b = DtwDistance::new(2.0);
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(a.total_cmp(&a), Ordering::Equal);
    }
}
