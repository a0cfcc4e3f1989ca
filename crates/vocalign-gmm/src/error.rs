/// Errors from Gaussian mixture fitting and regression.
#[derive(Debug, thiserror::Error)]
pub enum GmmError {
    /// Returned when zero mixture components are requested.
    #[error("n_components must be at least 1, got {n_components}")]
    InvalidComponents {
        /// The invalid component count.
        n_components: usize,
    },

    /// Returned when the training table has fewer rows than components.
    #[error("need at least {n_components} samples to fit {n_components} components, got {n_samples}")]
    TooFewSamples {
        /// Number of rows in the training table.
        n_samples: usize,
        /// Requested number of components.
        n_components: usize,
    },

    /// Returned when the training table has no feature columns.
    #[error("training table has no feature columns")]
    NoFeatures,

    /// Returned when an input table contains NaN or infinity.
    #[error("non-finite value at row {row}, column {col}")]
    NonFiniteValue {
        /// Row of the first non-finite value.
        row: usize,
        /// Column of the first non-finite value.
        col: usize,
    },

    /// Returned when an input does not have the feature width the model expects.
    #[error("expected {expected} feature columns, got {got}")]
    DimensionMismatch {
        /// Width the model was fitted on.
        expected: usize,
        /// Width of the provided input.
        got: usize,
    },

    /// Returned when a component covariance is not positive definite.
    #[error(
        "component {component} has an ill-defined covariance; \
         decrease n_components, increase reg_covar, or check for duplicate samples"
    )]
    IllDefinedCovariance {
        /// Index of the offending component.
        component: usize,
    },

    /// Returned when mixture parameters have inconsistent shapes or weights.
    #[error("invalid mixture parameters: {reason}")]
    InvalidParameters {
        /// Description of the inconsistency.
        reason: String,
    },

    /// Returned when a regression split leaves one side without dimensions.
    #[error("input_dim {input_dim} must lie strictly between 0 and the joint width {joint_dim}")]
    InvalidSplit {
        /// Requested width of the conditioning block.
        input_dim: usize,
        /// Width of the joint model.
        joint_dim: usize,
    },
}
