//! Band constraints and per-row search windows for DTW computation.

use std::ops::Range;

use crate::path::WarpingPath;

/// Constraint on the DTW warping window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BandConstraint {
    /// No constraint: the full cost matrix is computed.
    #[default]
    Unconstrained,

    /// Sakoe-Chiba band: cell (i,j) is valid only if |i - j| <= radius.
    SakoeChibaRadius(usize),
}

impl BandConstraint {
    /// Return the valid column range for a given row in the cost matrix.
    ///
    /// For unconstrained DTW, returns `0..n_cols`.
    /// For Sakoe-Chiba, returns the intersection of `[row - r, row + r]` with `[0, n_cols)`.
    #[must_use]
    pub fn column_range(&self, row: usize, n_cols: usize) -> Range<usize> {
        match self {
            Self::Unconstrained => 0..n_cols,
            Self::SakoeChibaRadius(r) => {
                let start = row.saturating_sub(*r).min(n_cols);
                let end = (row + r + 1).min(n_cols);
                start..end
            }
        }
    }
}

/// Contiguous column range per row of an `n x m` cost matrix.
///
/// The windowed DTW only evaluates cells inside these ranges. Rows are kept
/// connected so that a monotonic path from `(0, 0)` can reach row `n - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    rows: Vec<Range<usize>>,
    n_cols: usize,
}

impl SearchWindow {
    /// Window covering every cell of an `n_rows x n_cols` matrix.
    #[must_use]
    pub fn full(n_rows: usize, n_cols: usize) -> Self {
        Self::from_band(BandConstraint::Unconstrained, n_rows, n_cols)
    }

    /// Window induced by a band constraint.
    ///
    /// A Sakoe-Chiba band on a strongly rectangular matrix can leave the final
    /// cell outside every row; the window keeps those rows as given and the
    /// DTW reports the final cell as unreachable.
    #[must_use]
    pub fn from_band(constraint: BandConstraint, n_rows: usize, n_cols: usize) -> Self {
        let rows = (0..n_rows)
            .map(|i| constraint.column_range(i, n_cols))
            .collect();
        Self { rows, n_cols }
    }

    /// Project a path found on half-resolution sequences to full resolution.
    ///
    /// Every coarse cell within `radius` of the path (Chebyshev distance)
    /// expands to the 2x2 block of fine cells it was averaged from. Rows the
    /// projection misses (the odd trailing frame dropped by halving) inherit the
    /// previous row's range, and ranges are stretched so consecutive rows
    /// overlap and the corners `(0, 0)` and `(n_rows-1, n_cols-1)` are covered.
    #[must_use]
    pub fn from_coarse_path(
        coarse: &WarpingPath,
        n_rows: usize,
        n_cols: usize,
        radius: usize,
    ) -> Self {
        let mut lo = vec![usize::MAX; n_rows];
        let mut hi = vec![0usize; n_rows];

        for step in coarse {
            let col_lo = 2 * step.b.saturating_sub(radius);
            let col_hi = (2 * (step.b + radius) + 2).min(n_cols);
            if col_lo >= col_hi {
                continue;
            }
            for coarse_row in step.a.saturating_sub(radius)..=step.a + radius {
                for fine_row in [2 * coarse_row, 2 * coarse_row + 1] {
                    if fine_row >= n_rows {
                        continue;
                    }
                    lo[fine_row] = lo[fine_row].min(col_lo);
                    hi[fine_row] = hi[fine_row].max(col_hi);
                }
            }
        }

        let mut rows: Vec<Range<usize>> = Vec::with_capacity(n_rows);
        for i in 0..n_rows {
            let mut range = if lo[i] == usize::MAX {
                rows.last().cloned().unwrap_or(0..1)
            } else {
                lo[i]..hi[i]
            };
            if let Some(prev) = rows.last() {
                range.start = range.start.min(prev.end);
                range.end = range.end.max(prev.start + 1);
            }
            rows.push(range);
        }

        if let Some(first) = rows.first_mut() {
            first.start = 0;
        }
        if let Some(last) = rows.last_mut() {
            last.end = n_cols;
        }

        Self { rows, n_cols }
    }

    /// Column range evaluated in `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> Range<usize> {
        self.rows[row].clone()
    }

    /// Number of rows in the window.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns of the underlying matrix.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Total number of cells evaluated.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::WarpingStep;

    #[test]
    fn unconstrained_full_range() {
        let c = BandConstraint::Unconstrained;
        assert_eq!(c.column_range(0, 10), 0..10);
        assert_eq!(c.column_range(5, 10), 0..10);
    }

    #[test]
    fn sakoe_chiba_middle_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(5, 10), 3..8);
    }

    #[test]
    fn sakoe_chiba_edges() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(0, 10), 0..3);
        assert_eq!(c.column_range(9, 10), 7..10);
    }

    #[test]
    fn sakoe_chiba_row_past_last_column_is_empty() {
        let c = BandConstraint::SakoeChibaRadius(1);
        assert!(c.column_range(8, 4).is_empty());
    }

    #[test]
    fn full_window_cells() {
        let w = SearchWindow::full(3, 4);
        assert_eq!(w.n_cells(), 12);
        assert_eq!(w.row(2), 0..4);
    }

    #[test]
    fn coarse_diagonal_projects_to_band() {
        let coarse = WarpingPath::new(
            (0..3).map(|i| WarpingStep { a: i, b: i }).collect(),
        );
        let w = SearchWindow::from_coarse_path(&coarse, 6, 6, 0);
        assert_eq!(w.row(0), 0..2);
        assert_eq!(w.row(1), 0..2);
        assert_eq!(w.row(2), 2..4);
        assert_eq!(w.row(5), 4..6);
    }

    #[test]
    fn odd_trailing_row_is_covered() {
        // 7 fine rows halve to 3 coarse rows; fine row 6 is never projected.
        let coarse = WarpingPath::new(
            (0..3).map(|i| WarpingStep { a: i, b: i }).collect(),
        );
        let w = SearchWindow::from_coarse_path(&coarse, 7, 7, 0);
        assert_eq!(w.n_rows(), 7);
        assert_eq!(w.row(6).end, 7);
        assert!(w.row(6).start <= w.row(5).end);
    }

    #[test]
    fn projected_rows_overlap() {
        let coarse = WarpingPath::new(vec![
            WarpingStep { a: 0, b: 0 },
            WarpingStep { a: 0, b: 1 },
            WarpingStep { a: 0, b: 2 },
            WarpingStep { a: 1, b: 3 },
        ]);
        let w = SearchWindow::from_coarse_path(&coarse, 4, 8, 1);
        for i in 1..w.n_rows() {
            let (prev, cur) = (w.row(i - 1), w.row(i));
            assert!(cur.start <= prev.end, "row {i} disconnected");
            assert!(!cur.is_empty());
        }
        assert_eq!(w.row(3).end, 8);
    }
}
