//! Warping path types for DTW alignment.

/// A single step in a DTW warping path, mapping frame `a` of the source
/// sequence to frame `b` of the target sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpingStep {
    /// Frame index in the source sequence.
    pub a: usize,
    /// Frame index in the target sequence.
    pub b: usize,
}

/// An ordered sequence of warping steps from `(0, 0)` to `(n-1, m-1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpingPath(Vec<WarpingStep>);

impl WarpingPath {
    /// Create a new warping path from a vector of steps.
    pub(crate) fn new(steps: Vec<WarpingStep>) -> Self {
        Self(steps)
    }

    /// Return the warping steps as a slice.
    #[must_use]
    pub fn steps(&self) -> &[WarpingStep] {
        &self.0
    }

    /// Return the number of steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Source frame index of every step, in path order.
    ///
    /// Indexing the source sequence with this list yields the source side of
    /// the aligned pair. Indices repeat where the path moves vertically.
    #[must_use]
    pub fn source_indices(&self) -> Vec<usize> {
        self.0.iter().map(|s| s.a).collect()
    }

    /// Target frame index of every step, in path order.
    #[must_use]
    pub fn target_indices(&self) -> Vec<usize> {
        self.0.iter().map(|s| s.b).collect()
    }

    /// Return true if both indices are non-decreasing along the path.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|w| w[1].a >= w[0].a && w[1].b >= w[0].b)
    }
}

impl<'a> IntoIterator for &'a WarpingPath {
    type Item = &'a WarpingStep;
    type IntoIter = std::slice::Iter<'a, WarpingStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
