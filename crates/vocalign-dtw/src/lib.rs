//! Multi-dimensional DTW alignment of feature-frame sequences.
//!
//! Pure math library, zero I/O. Provides exact DTW with an optional
//! Sakoe-Chiba band, multi-resolution FastDTW, pluggable frame metrics,
//! warping path extraction, and trimming of zero-padding frames.

mod constraint;
mod distance;
mod dtw;
mod error;
mod fast;
mod frames;
mod path;
mod trim;

pub use constraint::{BandConstraint, SearchWindow};
pub use distance::{DtwDistance, Euclidean, FrameMetric, Manhattan, SquaredEuclidean};
pub use dtw::Dtw;
pub use error::{DtwError, Side};
pub use fast::FastDtw;
pub use frames::FrameView;
pub use path::{WarpingPath, WarpingStep};
pub use trim::{TrimSide, trailing_padding, trim_zero_frames, trim_zero_frames_with};
