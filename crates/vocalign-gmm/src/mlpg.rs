//! Maximum-likelihood parameter generation from a joint mixture.
//!
//! A joint model over `[x, y]` is split into a source block and a target
//! block. Without dynamic features the maximum-likelihood trajectory reduces
//! to the per-frame posterior-weighted conditional mean
//! `Σ_m p(m | x) (μy_m + A_m (x - μx_m))` with `A_m = Σyx_m Σxx_m⁻¹`.

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::GmmError;
use crate::gaussian::CholeskyCovariance;
use crate::model::{GaussianMixture, check_finite};

/// Per-component linear regressors for one direction of the split.
#[derive(Debug, Clone)]
struct Regression {
    /// Marginal mixture over the conditioning block.
    source: GaussianMixture,
    /// `μy_m`, shape `(K, out_dim)`.
    target_means: Array2<f64>,
    /// `A_m`, each of shape `(out_dim, in_dim)`.
    gains: Vec<Array2<f64>>,
}

impl Regression {
    fn build(
        joint: &GaussianMixture,
        source_dims: Range<usize>,
        target_dims: Range<usize>,
    ) -> Result<Self, GmmError> {
        let source = joint.marginal(source_dims.clone())?;
        let covs = joint.covariances();
        let gains = (0..joint.n_components())
            .map(|component| {
                let sxx = covs.slice(s![component, source_dims.clone(), source_dims.clone()]);
                let sxy = covs.slice(s![component, source_dims.clone(), target_dims.clone()]);
                // Σxx⁻¹ Σxy is (in, out); its transpose is Σyx Σxx⁻¹.
                CholeskyCovariance::factor(sxx)
                    .and_then(|factor| factor.solve(sxy))
                    .map(|gain| gain.reversed_axes())
                    .ok_or(GmmError::IllDefinedCovariance { component })
            })
            .collect::<Result<Vec<_>, GmmError>>()?;
        let target_means = joint.means().slice(s![.., target_dims]).to_owned();
        Ok(Self {
            source,
            target_means,
            gains,
        })
    }

    fn in_dim(&self) -> usize {
        self.source.n_features()
    }

    fn out_dim(&self) -> usize {
        self.target_means.ncols()
    }

    fn predict_frame(&self, x: ndarray::ArrayView1<'_, f64>) -> Array1<f64> {
        let (posterior, _) = self.source.posterior(x);
        let mut y = Array1::<f64>::zeros(self.out_dim());
        for (m, p) in posterior.iter().enumerate() {
            if *p == 0.0 {
                continue;
            }
            let centered = &x - &self.source.means().row(m);
            let conditional = &self.target_means.row(m) + &self.gains[m].dot(&centered);
            y.scaled_add(*p, &conditional);
        }
        y
    }
}

/// Frame-wise regression from one block of a joint mixture to the other.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `swap`    | false   |
/// | `diff`    | false   |
#[derive(Debug, Clone)]
pub struct MlParameterGeneration {
    forward: Regression,
    backward: Regression,
    swap: bool,
    diff: bool,
}

impl MlParameterGeneration {
    /// Prepare regressors from `joint`, whose first `input_dim` features form
    /// the source block and whose remaining features form the target block.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::InvalidSplit`] | `input_dim` is zero or not less than the joint width |
    /// | [`GmmError::IllDefinedCovariance`] | A block covariance is not positive definite |
    pub fn new(joint: &GaussianMixture, input_dim: usize) -> Result<Self, GmmError> {
        let joint_dim = joint.n_features();
        if input_dim == 0 || input_dim >= joint_dim {
            return Err(GmmError::InvalidSplit {
                input_dim,
                joint_dim,
            });
        }
        let forward = Regression::build(joint, 0..input_dim, input_dim..joint_dim)?;
        let backward = Regression::build(joint, input_dim..joint_dim, 0..input_dim)?;
        Ok(Self {
            forward,
            backward,
            swap: false,
            diff: false,
        })
    }

    /// Regress the first block from the second instead.
    #[must_use]
    pub fn with_swap(mut self, swap: bool) -> Self {
        self.swap = swap;
        self
    }

    /// Treat the target block as a difference and add the input back.
    /// Both blocks must then have the same width.
    #[must_use]
    pub fn with_diff(mut self, diff: bool) -> Self {
        self.diff = diff;
        self
    }

    /// Return whether the blocks are swapped.
    #[must_use]
    pub fn swap(&self) -> bool {
        self.swap
    }

    /// Return whether the differential mode is on.
    #[must_use]
    pub fn diff(&self) -> bool {
        self.diff
    }

    /// Width of the frames [`transform`][Self::transform] accepts.
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.active().in_dim()
    }

    /// Width of the frames [`transform`][Self::transform] returns.
    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.active().out_dim()
    }

    fn active(&self) -> &Regression {
        if self.swap { &self.backward } else { &self.forward }
    }

    /// Convert every row of `frames` from the source block to the target block.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GmmError::DimensionMismatch`] | `frames` width differs from [`input_dim`][Self::input_dim] |
    /// | [`GmmError::NonFiniteValue`] | `frames` holds NaN or infinity |
    /// | [`GmmError::InvalidParameters`] | Differential mode with blocks of different widths |
    #[instrument(skip(self, frames), fields(n_frames = frames.nrows(), swap = self.swap, diff = self.diff))]
    pub fn transform(&self, frames: ArrayView2<'_, f64>) -> Result<Array2<f64>, GmmError> {
        let regression = self.active();
        if frames.ncols() != regression.in_dim() {
            return Err(GmmError::DimensionMismatch {
                expected: regression.in_dim(),
                got: frames.ncols(),
            });
        }
        if self.diff && regression.in_dim() != regression.out_dim() {
            return Err(GmmError::InvalidParameters {
                reason: format!(
                    "differential mode needs equal block widths, got {} and {}",
                    regression.in_dim(),
                    regression.out_dim()
                ),
            });
        }
        check_finite(frames)?;

        let rows: Vec<Array1<f64>> = (0..frames.nrows())
            .into_par_iter()
            .map(|i| regression.predict_frame(frames.row(i)))
            .collect();

        let mut out = Array2::<f64>::zeros((frames.nrows(), regression.out_dim()));
        for (mut dst, row) in out.axis_iter_mut(Axis(0)).zip(rows) {
            dst.assign(&row);
        }
        if self.diff {
            out += &frames;
        }
        debug!("regression complete");
        Ok(out)
    }
}
