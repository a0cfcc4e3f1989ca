//! K-means initialization of mixture responsibilities (private module).
//!
//! Seeds `k` centers with k-means++ over the rows of the training table, then
//! runs a few Lloyd iterations. The resulting hard assignments become the
//! initial responsibilities for EM.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::label::ComponentLabel;

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Select `k` initial center rows from `table` using k-means++ seeding.
///
/// The first center is chosen uniformly at random; each subsequent center is
/// drawn with probability proportional to the squared distance from that row
/// to the nearest already-chosen center.
///
/// # Panics
///
/// Panics in debug mode if `k == 0` or `k > table.nrows()`.
#[must_use]
pub(crate) fn kmeans_plus_plus(table: ArrayView2<'_, f64>, k: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let n = table.nrows();
    debug_assert!(k > 0, "k must be at least 1");
    debug_assert!(k <= n, "k must not exceed the number of rows");

    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));

    // Squared distance from every row to its nearest chosen center.
    let mut nearest: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| squared_distance(table.row(i), table.row(chosen[0])))
        .collect();

    for _ in 1..k {
        for &c in &chosen {
            nearest[c] = 0.0;
        }
        let total_weight: f64 = nearest.iter().sum();

        let selected = if total_weight > 0.0 {
            let threshold: f64 = rng.gen_range(0.0..total_weight);
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (i, &w) in nearest.iter().enumerate() {
                cumsum += w;
                if cumsum > threshold {
                    selected = i;
                    break;
                }
            }
            selected
        } else {
            // Every remaining row duplicates a center; take any unchosen index.
            (0..n).find(|i| !chosen.contains(i)).unwrap_or(n - 1)
        };
        chosen.push(selected);

        let center = table.row(selected);
        nearest
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, d)| *d = d.min(squared_distance(table.row(i), center)));
    }

    chosen
}

/// Assign every row to its nearest center.
fn assign(table: ArrayView2<'_, f64>, centers: &Array2<f64>) -> Vec<ComponentLabel> {
    (0..table.nrows())
        .into_par_iter()
        .map(|i| {
            let row = table.row(i);
            let best = centers
                .axis_iter(Axis(0))
                .map(|c| squared_distance(row, c))
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map_or(0, |(k, _)| k);
            ComponentLabel::new(best)
        })
        .collect()
}

/// Seed with k-means++ and refine with up to `max_iter` Lloyd iterations.
///
/// Returns one label per row. A center that loses all its rows keeps its
/// previous position.
pub(crate) fn kmeans_labels(
    table: ArrayView2<'_, f64>,
    k: usize,
    max_iter: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<ComponentLabel> {
    let seeds = kmeans_plus_plus(table, k, rng);
    let mut centers = table.select(Axis(0), &seeds);
    let mut labels = assign(table, &centers);

    for iteration in 0..max_iter {
        let mut sums = Array2::<f64>::zeros(centers.dim());
        let mut counts = vec![0usize; k];
        for (row, label) in table.axis_iter(Axis(0)).zip(&labels) {
            let mut acc = sums.row_mut(label.index());
            acc += &row;
            counts[label.index()] += 1;
        }
        for (c, &count) in counts.iter().enumerate() {
            if count > 0 {
                let mean = sums.row(c).mapv(|v| v / count as f64);
                centers.row_mut(c).assign(&mean);
            }
        }

        let next = assign(table, &centers);
        if next == labels {
            debug!(iteration, "lloyd iterations converged");
            break;
        }
        labels = next;
    }

    labels
}
