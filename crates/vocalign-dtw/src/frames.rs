//! Validated views over frame sequences.

use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::error::{DtwError, Side};

/// Borrowed, validated `(frames, dims)` sequence. Guaranteed to hold at least
/// one frame and only finite values.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a>(ArrayView2<'a, f64>);

impl<'a> FrameView<'a> {
    /// Validate `frames` as one side of an alignment.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySequence`] | `frames` has no rows |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(frames: ArrayView2<'a, f64>, side: Side) -> Result<Self, DtwError> {
        if frames.nrows() == 0 {
            return Err(DtwError::EmptySequence { side });
        }
        for (frame, row) in frames.axis_iter(Axis(0)).enumerate() {
            if let Some(dim) = row.iter().position(|v| !v.is_finite()) {
                return Err(DtwError::NonFiniteValue { side, frame, dim });
            }
        }
        Ok(Self(frames))
    }

    /// Wrap frames that are known to be valid, such as averages of valid frames.
    pub(crate) fn new_unchecked(frames: ArrayView2<'a, f64>) -> Self {
        Self(frames)
    }

    /// Return the underlying array view.
    #[must_use]
    pub fn as_array(&self) -> ArrayView2<'a, f64> {
        self.0
    }

    /// Return frame `index` as a feature vector.
    #[must_use]
    pub fn frame(&self, index: usize) -> ArrayView1<'a, f64> {
        self.0.index_axis_move(Axis(0), index)
    }

    /// Return the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    /// Return true if the view has no frames.
    ///
    /// Always `false` for views built with [`FrameView::new`]; provided to
    /// satisfy the `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.nrows() == 0
    }

    /// Return the feature dimension of each frame.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.0.ncols()
    }
}
