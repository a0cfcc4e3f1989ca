//! Removal of all-zero padding frames.
//!
//! Batched feature sequences are zero-padded at the tail to a common length.
//! Trimming recovers the true sequence as a zero-copy view.

use ndarray::{ArrayView2, Axis, s};

/// Which end of a sequence to strip zero frames from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrimSide {
    /// Strip leading zero frames only.
    Front,
    /// Strip trailing zero frames only.
    #[default]
    Back,
    /// Strip both leading and trailing zero frames.
    Both,
}

/// Remove the trailing run of frames whose values are all exactly zero.
///
/// Interior zero frames are preserved. An all-zero sequence trims to zero
/// frames.
#[must_use]
pub fn trim_zero_frames(frames: ArrayView2<'_, f64>) -> ArrayView2<'_, f64> {
    trim_zero_frames_with(frames, 0.0, TrimSide::Back)
}

/// Remove leading and/or trailing frames whose absolute sum is zero or `< eps`.
#[must_use]
pub fn trim_zero_frames_with(
    frames: ArrayView2<'_, f64>,
    eps: f64,
    side: TrimSide,
) -> ArrayView2<'_, f64> {
    let is_padding = |row: ndarray::ArrayView1<'_, f64>| {
        let s: f64 = row.iter().map(|v| v.abs()).sum();
        s == 0.0 || s < eps
    };
    let rows: Vec<bool> = frames.axis_iter(Axis(0)).map(is_padding).collect();

    let start = match side {
        TrimSide::Back => 0,
        TrimSide::Front | TrimSide::Both => {
            rows.iter().position(|&p| !p).unwrap_or(rows.len())
        }
    };
    let end = match side {
        TrimSide::Front => rows.len(),
        TrimSide::Back | TrimSide::Both => {
            rows.iter().rposition(|&p| !p).map_or(0, |last| last + 1)
        }
    };

    frames.slice_move(s![start..end.max(start), ..])
}

/// Number of trailing zero frames in `frames`.
#[must_use]
pub fn trailing_padding(frames: ArrayView2<'_, f64>) -> usize {
    frames.nrows() - trim_zero_frames(frames).nrows()
}
