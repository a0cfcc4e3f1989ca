//! Gaussian mixture models fitted with EM, and frame-wise regression
//! between the blocks of a joint mixture.
//!
//! Provides k-means++ initialized EM with full or diagonal covariances,
//! seeded multi-restart fitting, density queries on the fitted model, and
//! maximum-likelihood parameter generation for voice-conversion style
//! source-to-target mapping.

mod config;
mod em;
mod error;
mod gaussian;
mod init;
mod label;
mod likelihood;
mod mlpg;
mod model;

pub use config::{CovarianceType, GmmConfig};
pub use error::GmmError;
pub use label::ComponentLabel;
pub use likelihood::LogLikelihood;
pub use mlpg::MlParameterGeneration;
pub use model::GaussianMixture;
