//! Error type for batch alignment.

use vocalign_dtw::{DtwError, Side};
use vocalign_gmm::GmmError;

/// Errors from the batch aligners.
///
/// Any error aborts the whole `transform` call; no partially aligned batch is
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Returned when an input batch is not three-dimensional.
    #[error("{side} batch must have rank 3 (batch, time, feature), got rank {ndim}")]
    InvalidRank {
        /// The offending batch.
        side: Side,
        /// Its number of axes.
        ndim: usize,
    },

    /// Returned when the two batches hold different numbers of items.
    #[error("source batch has {source_items} items but target batch has {target_items}")]
    BatchSizeMismatch {
        /// Items in the source batch.
        source_items: usize,
        /// Items in the target batch.
        target_items: usize,
    },

    /// Returned when the iterative aligner receives batches with different
    /// feature widths.
    #[error("iterative alignment needs equal feature widths, got {source_dim} and {target_dim}")]
    FeatureDimMismatch {
        /// Feature width of the source batch.
        source_dim: usize,
        /// Feature width of the target batch.
        target_dim: usize,
    },

    /// Returned when the iterative aligner receives batches with different
    /// padded lengths, which cannot be stacked into one joint table.
    #[error("iterative alignment needs equal padded lengths, got {source_frames} and {target_frames}")]
    FrameCountMismatch {
        /// Padded length of the source batch.
        source_frames: usize,
        /// Padded length of the target batch.
        target_frames: usize,
    },

    /// Returned when zero refinement rounds are requested.
    #[error("n_iter must be at least 1, got {n_iter}")]
    InvalidIterations {
        /// The invalid round count.
        n_iter: usize,
    },

    /// Returned when an item is entirely zero padding.
    #[error("item {item}: {side} sequence is empty after trimming zero padding")]
    EmptySequence {
        /// Batch index of the item.
        item: usize,
        /// The empty side.
        side: Side,
    },

    /// Returned when DTW fails on an item.
    #[error("item {item}: alignment failed")]
    Dtw {
        /// Batch index of the item.
        item: usize,
        /// Underlying DTW error.
        #[source]
        source: DtwError,
    },

    /// Returned when fitting or applying the joint mixture fails.
    #[error("round {round}: joint model failed")]
    Gmm {
        /// Zero-based refinement round.
        round: usize,
        /// Underlying mixture error.
        #[source]
        source: GmmError,
    },
}
