//! Frame alignment of paired feature-sequence batches for voice conversion.
//!
//! Provides a single-pass DTW aligner and an iterative aligner that
//! alternates DTW with a joint Gaussian mixture regression of the source
//! side. Both take zero-padded `(batch, time, feature)` arrays and return
//! aligned arrays of the same shapes.

mod batch;
mod error;
mod iterative;
mod method;
mod pairwise;

pub use batch::{PairReport, write_truncated};
pub use error::AlignError;
pub use iterative::{IterativeAligner, IterativeReport};
pub use method::DtwMethod;
pub use pairwise::PairwiseAligner;

pub use vocalign_dtw::{
    BandConstraint, DtwDistance, Euclidean, FrameMetric, Manhattan, SquaredEuclidean, WarpingPath,
};
pub use vocalign_gmm::{CovarianceType, GmmConfig};
