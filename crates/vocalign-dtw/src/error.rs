//! Error types for DTW alignment and sequence validation.

/// Which of the two aligned sequences an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The first (source) sequence.
    Source,
    /// The second (target) sequence.
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Errors from DTW alignment and frame sequence validation.
#[derive(Debug, thiserror::Error)]
pub enum DtwError {
    /// Returned when a sequence has no frames.
    #[error("{side} sequence must contain at least one frame")]
    EmptySequence {
        /// The offending sequence.
        side: Side,
    },

    /// Returned when the metric cannot compare frames of the given widths.
    #[error("metric cannot compare {source_dim}-dim source frames with {target_dim}-dim target frames")]
    DimensionMismatch {
        /// Feature dimension of the source sequence.
        source_dim: usize,
        /// Feature dimension of the target sequence.
        target_dim: usize,
    },

    /// Returned when a sequence contains NaN, infinity, or negative infinity.
    #[error("{side} sequence contains non-finite value at frame {frame}, dim {dim}")]
    NonFiniteValue {
        /// The offending sequence.
        side: Side,
        /// Frame index of the first non-finite value.
        frame: usize,
        /// Feature index of the first non-finite value.
        dim: usize,
    },

    /// Returned when the search window leaves the final cell unreachable.
    #[error("cell ({rows}, {cols}) is unreachable under the search window")]
    Unreachable {
        /// Last row index.
        rows: usize,
        /// Last column index.
        cols: usize,
    },
}
