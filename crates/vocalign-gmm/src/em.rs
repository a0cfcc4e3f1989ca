//! Expectation-maximization for Gaussian mixtures.
//!
//! Provides the E and M steps, a single seeded restart, and multi-restart
//! orchestration that keeps the restart with the highest lower bound.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::{CovarianceType, GmmConfig};
use crate::error::GmmError;
use crate::init::kmeans_labels;
use crate::likelihood::LogLikelihood;
use crate::model::GaussianMixture;

/// Floor added to every component mass so empty components do not divide by zero.
const MASS_FLOOR: f64 = 10.0 * f64::EPSILON;

// ── e_step ────────────────────────────────────────────────────────────────────

/// Compute responsibilities `p(k | x_i)` and the mean log-likelihood of `table`.
pub(crate) fn e_step(model: &GaussianMixture, table: ArrayView2<'_, f64>) -> (Array2<f64>, LogLikelihood) {
    let rows: Vec<(Vec<f64>, f64)> = (0..table.nrows())
        .into_par_iter()
        .map(|i| model.posterior(table.row(i)))
        .collect();

    let n = rows.len();
    let k = model.n_components();
    let mut resp = Array2::<f64>::zeros((n, k));
    let mut total = 0.0;
    for (i, (posterior, log_norm)) in rows.into_iter().enumerate() {
        resp.row_mut(i).assign(&Array1::from(posterior));
        total += log_norm;
    }
    (resp, LogLikelihood::new(total / n as f64))
}

// ── m_step ────────────────────────────────────────────────────────────────────

/// Re-estimate weights, means and covariances from responsibilities.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`GmmError::IllDefinedCovariance`] | A regularized covariance is still not positive definite |
pub(crate) fn m_step(
    table: ArrayView2<'_, f64>,
    resp: &Array2<f64>,
    config: &GmmConfig,
) -> Result<GaussianMixture, GmmError> {
    let (n, d) = table.dim();
    let k = resp.ncols();

    let nk: Array1<f64> = resp.sum_axis(Axis(0)).mapv(|v| v + MASS_FLOOR);
    let means: Array2<f64> = resp.t().dot(&table) / &nk.view().insert_axis(Axis(1));

    let blocks: Vec<Array2<f64>> = (0..k)
        .into_par_iter()
        .map(|c| {
            let diff = &table - &means.row(c);
            let weighted = &diff * &resp.column(c).insert_axis(Axis(1));
            let mut cov = weighted.t().dot(&diff) / nk[c];
            if config.covariance_type == CovarianceType::Diagonal {
                let diag = cov.diag().to_owned();
                cov = Array2::from_diag(&diag);
            }
            for j in 0..d {
                cov[[j, j]] += config.reg_covar;
            }
            cov
        })
        .collect();

    let mut covariances = Array3::<f64>::zeros((k, d, d));
    for (c, block) in blocks.into_iter().enumerate() {
        covariances.index_axis_mut(Axis(0), c).assign(&block);
    }
    let weights = &nk / nk.sum();

    debug!(n, k, "m-step complete");
    GaussianMixture::from_params(weights, means, covariances, config.covariance_type)
}

// ── run_once ──────────────────────────────────────────────────────────────────

/// Run a single EM restart seeded with `seed`.
///
/// # Errors
///
/// Propagates [`GmmError::IllDefinedCovariance`] from any M-step.
#[instrument(skip(table, config), fields(k = config.n_components, seed))]
fn run_once(
    table: ArrayView2<'_, f64>,
    config: &GmmConfig,
    seed: u64,
) -> Result<GaussianMixture, GmmError> {
    let (n, _) = table.dim();
    let k = config.n_components;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels = kmeans_labels(table, k, config.kmeans_max_iter, &mut rng);
    let mut resp = Array2::<f64>::zeros((n, k));
    for (i, label) in labels.iter().enumerate() {
        resp[[i, label.index()]] = 1.0;
    }
    let mut model = m_step(table, &resp, config)?;

    let mut lower_bound = LogLikelihood::new(f64::NEG_INFINITY);
    let mut converged = false;
    let mut iterations = 0usize;

    for iteration in 0..config.max_iter {
        iterations = iteration + 1;
        let prev = lower_bound;

        let (next_resp, bound) = e_step(&model, table);
        resp = next_resp;
        lower_bound = bound;
        model = m_step(table, &resp, config)?;

        let change = lower_bound.value() - prev.value();
        debug!(iteration, lower_bound = lower_bound.value(), change, "em iteration complete");

        if change.abs() < config.tol {
            converged = true;
            break;
        }
    }

    if config.max_iter == 0 {
        lower_bound = e_step(&model, table).1;
    }

    if !converged {
        warn!(
            seed,
            max_iter = config.max_iter,
            lower_bound = lower_bound.value(),
            "em did not converge; try a larger max_iter, a larger tol, or a larger reg_covar"
        );
    }

    info!(
        seed,
        iterations,
        lower_bound = lower_bound.value(),
        converged,
        "single restart complete"
    );

    Ok(model.with_fit_metadata(converged, iterations, lower_bound))
}

// ── multi_restart ─────────────────────────────────────────────────────────────

/// Run `config.n_init` independent EM restarts and return the best mixture.
///
/// Restarts are executed in parallel. Sub-seeds are derived deterministically
/// from `config.seed` so the overall computation is reproducible.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`GmmError::IllDefinedCovariance`] | A restart produces a covariance that is not positive definite |
#[instrument(skip(table, config), fields(k = config.n_components, n_init = config.n_init))]
pub(crate) fn multi_restart(
    table: ArrayView2<'_, f64>,
    config: &GmmConfig,
) -> Result<GaussianMixture, GmmError> {
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.n_init).map(|_| master_rng.r#gen()).collect();
    let n_init = seeds.len();

    let results: Vec<Result<GaussianMixture, GmmError>> = seeds
        .into_par_iter()
        .map(|seed| run_once(table, config, seed))
        .collect();

    let mut best: Option<GaussianMixture> = None;
    for result in results {
        let run = result?;
        best = Some(match best {
            None => run,
            Some(prev) => {
                if run.lower_bound().total_cmp(&prev.lower_bound()) == Ordering::Greater {
                    run
                } else {
                    prev
                }
            }
        });
    }

    let best = best.ok_or(GmmError::InvalidParameters {
        reason: "no restart was run".to_owned(),
    })?;

    info!(
        k = config.n_components,
        n_init,
        best_lower_bound = best.lower_bound().value(),
        converged = best.converged(),
        "multi-restart complete"
    );

    Ok(best)
}
