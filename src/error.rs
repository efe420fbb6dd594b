//! Error types for the Kolosal classification pipeline

use thiserror::Error;

/// Result type alias for Kolosal operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the pipeline, recorder and inference adapter
#[derive(Error, Debug)]
pub enum KolosalError {
    /// Invalid split fraction, fold count, registry entry or hyperparameter.
    /// Raised before any model is fitted.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A single candidate failed to fit. Isolated to that candidate.
    #[error("Fit failed for candidate '{candidate}': {reason}")]
    FitError { candidate: String, reason: String },

    /// Malformed feature rows or an unmapped predicted label
    #[error("Invalid shape: expected {expected}, got {actual}")]
    DataShapeError { expected: String, actual: String },

    /// The run recorder could not durably write a run
    #[error("Persistence error at {path}: {reason}")]
    PersistenceError { path: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Convergence failed after {iterations} iterations")]
    ConvergenceError { iterations: usize },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl KolosalError {
    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        KolosalError::DataShapeError {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn persistence(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        KolosalError::PersistenceError {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is confined to one candidate's run
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            KolosalError::FitError { .. }
                | KolosalError::InvalidParameter { .. }
                | KolosalError::ConvergenceError { .. }
                | KolosalError::ModelNotFitted
        )
    }
}

impl From<polars::error::PolarsError> for KolosalError {
    fn from(err: polars::error::PolarsError) -> Self {
        KolosalError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<image::ImageError> for KolosalError {
    fn from(err: image::ImageError) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}
