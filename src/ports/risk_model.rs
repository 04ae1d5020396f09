//! Risk model port: Trait for a trained binary classifier with an exact explainer.
//!
//! This trait abstracts the model family (gradient-boosted trees today) from
//! the application logic.

use crate::domain::{Attribution, Feature, FeatureRow};

/// Errors raised while loading or evaluating a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Cannot read model artifact: {0}")]
    Io(String),

    #[error("Invalid model artifact: {0}")]
    Format(String),

    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(String),

    #[error("Non-finite input value for feature {0}")]
    NonFinite(Feature),

    #[error("Numeric error: {0}")]
    Numeric(String),
}

/// A loaded, immutable risk model.
///
/// Implementations must be deterministic: the same row always yields
/// bit-identical outputs. All methods take `&self`, so one instance can be
/// shared across threads without locking.
pub trait RiskModel: std::fmt::Debug + Send + Sync {
    /// Raw model output (log-odds) for one row.
    ///
    /// # Errors
    /// Returns `ModelError::NonFinite` for NaN/infinite inputs and
    /// `ModelError::Numeric` if the output is not finite.
    fn raw_output(&self, row: &FeatureRow) -> Result<f64, ModelError>;

    /// Probability of the positive class, in `[0, 1]`.
    ///
    /// # Errors
    /// Same as [`RiskModel::raw_output`].
    fn predict_probability(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        Ok(logistic(self.raw_output(row)?))
    }

    /// Exact additive attribution of [`RiskModel::raw_output`] for one row.
    ///
    /// # Errors
    /// Same as [`RiskModel::raw_output`].
    fn explain(&self, row: &FeatureRow) -> Result<Attribution, ModelError>;
}

/// Logistic link from log-odds to probability.
#[must_use]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
