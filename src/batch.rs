//! Batch validation, per-item alignment and truncating buffer writes.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewD, ArrayViewMut2, Axis, Ix3, s};
use rayon::prelude::*;
use tracing::{debug, info};
use vocalign_dtw::{DtwDistance, FrameMetric, Side, WarpingPath, trim_zero_frames};

use crate::error::AlignError;
use crate::method::DtwMethod;

/// Alignment summary for one batch item.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    /// Accumulated DTW cost along the path.
    pub distance: DtwDistance,
    /// `distance / (source_len + target_len)`.
    pub normalized_distance: f64,
    /// The warping path between the trimmed sequences.
    pub path: WarpingPath,
    /// Source length after trimming.
    pub source_len: usize,
    /// Target length after trimming.
    pub target_len: usize,
}

/// One aligned item: both trimmed sequences gathered along the path.
pub(crate) struct ItemAlignment {
    pub(crate) source_rows: Array2<f64>,
    pub(crate) target_rows: Array2<f64>,
    pub(crate) report: PairReport,
}

/// View a dynamic-rank batch as `(batch, time, feature)`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`AlignError::InvalidRank`] | `batch` does not have exactly three axes |
pub(crate) fn as_batch<'a>(batch: ArrayViewD<'a, f64>, side: Side) -> Result<ArrayView3<'a, f64>, AlignError> {
    let ndim = batch.ndim();
    batch
        .into_dimensionality::<Ix3>()
        .map_err(|_| AlignError::InvalidRank { side, ndim })
}

/// Check that both batches hold the same number of items and return it.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`AlignError::BatchSizeMismatch`] | The batch sizes differ |
pub(crate) fn check_batch_sizes(x: ArrayView3<'_, f64>, y: ArrayView3<'_, f64>) -> Result<usize, AlignError> {
    let (source_items, target_items) = (x.len_of(Axis(0)), y.len_of(Axis(0)));
    if source_items != target_items {
        return Err(AlignError::BatchSizeMismatch {
            source_items,
            target_items,
        });
    }
    Ok(source_items)
}

/// Trim the trailing zero padding of one item.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`AlignError::EmptySequence`] | The item is entirely zero padding |
pub(crate) fn trimmed(seq: ArrayView2<'_, f64>, item: usize, side: Side) -> Result<ArrayView2<'_, f64>, AlignError> {
    let seq = trim_zero_frames(seq);
    if seq.nrows() == 0 {
        return Err(AlignError::EmptySequence { item, side });
    }
    Ok(seq)
}

/// Copy the leading rows of `src` into `dst`, dropping whatever does not fit.
///
/// Returns the number of rows copied, `min(src.nrows(), dst.nrows())`. Rows
/// of `dst` past that count are left as they were. Frames beyond the
/// capacity are discarded, never wrapped.
pub fn write_truncated(mut dst: ArrayViewMut2<'_, f64>, src: ArrayView2<'_, f64>) -> usize {
    let rows = src.nrows().min(dst.nrows());
    dst.slice_mut(s![..rows, ..]).assign(&src.slice(s![..rows, ..]));
    rows
}

/// Trim, align and gather every item of a batch pair.
///
/// Items are processed in parallel. The first failure aborts the batch.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`AlignError::EmptySequence`] | An item is entirely zero padding |
/// | [`AlignError::Dtw`] | DTW fails on an item |
pub(crate) fn align_items<M: FrameMetric + Clone>(
    method: DtwMethod,
    metric: &M,
    verbose: u8,
    x: ArrayView3<'_, f64>,
    y: ArrayView3<'_, f64>,
) -> Result<Vec<ItemAlignment>, AlignError> {
    (0..x.len_of(Axis(0)))
        .into_par_iter()
        .map(|item| {
            let xi = trimmed(x.index_axis(Axis(0), item), item, Side::Source)?;
            let yi = trimmed(y.index_axis(Axis(0), item), item, Side::Target)?;
            let (distance, path) = method
                .align(metric, xi, yi)
                .map_err(|source| AlignError::Dtw { item, source })?;

            let normalized_distance = distance.normalized(xi.nrows(), yi.nrows());
            if verbose > 0 {
                info!(item, distance = normalized_distance, "normalized alignment distance");
            }
            debug!(
                item,
                source_len = xi.nrows(),
                target_len = yi.nrows(),
                path_len = path.len(),
                "item aligned"
            );

            let source_rows = xi.select(Axis(0), &path.source_indices());
            let target_rows = yi.select(Axis(0), &path.target_indices());
            Ok(ItemAlignment {
                source_rows,
                target_rows,
                report: PairReport {
                    distance,
                    normalized_distance,
                    source_len: xi.nrows(),
                    target_len: yi.nrows(),
                    path,
                },
            })
        })
        .collect()
}

/// Write every aligned item into the front of its slot in `x_out` / `y_out`.
pub(crate) fn write_items(x_out: &mut Array3<f64>, y_out: &mut Array3<f64>, items: &[ItemAlignment]) {
    for (i, item) in items.iter().enumerate() {
        let written = write_truncated(x_out.index_axis_mut(Axis(0), i), item.source_rows.view());
        write_truncated(y_out.index_axis_mut(Axis(0), i), item.target_rows.view());
        if written < item.source_rows.nrows() {
            debug!(
                item = i,
                path_len = item.source_rows.nrows(),
                capacity = written,
                "aligned frames truncated to buffer length"
            );
        }
    }
}
