//! Kolosal Classify - classification experiments and model serving
//!
//! Fits several candidate classifiers on a labeled tabular dataset, scores
//! each on a held-out split and with k-fold cross-validation, records every
//! run under an experiment, and serves one recorded model.
//!
//! # Modules
//!
//! ## Experiment pipeline
//! - [`dataset`] - Labeled dataset, label map, deterministic split
//! - [`training`] - Classifiers, cross-validation, candidate registry
//! - [`evaluation`] - Weighted metrics, confusion matrix, `evaluate`
//! - [`tracking`] - Run recorder and run queries
//! - [`pipeline`] - Sequential candidate loop
//!
//! ## Serving
//! - [`inference`] - Model bundle and inference adapter
//! - [`server`] - HTTP surface
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use kolosal_classify::prelude::*;
//!
//! let config = PipelineConfig::default().with_tracking_dir("./mlruns");
//! let report = Pipeline::new(config.clone()).run(&config.run_context())?;
//! assert!(report.is_complete());
//! # Ok::<(), KolosalError>(())
//! ```

// Core error handling
pub mod error;
pub mod config;

// Experiment pipeline
pub mod dataset;
pub mod training;
pub mod evaluation;
pub mod tracking;
pub mod pipeline;

// Serving
pub mod inference;
pub mod server;
pub mod cli;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{KolosalError, Result};

    // Configuration
    pub use crate::config::{PipelineConfig, RunContext};

    // Data
    pub use crate::dataset::{split, Dataset, LabelMap, Split};

    // Training
    pub use crate::training::{
        CandidateRegistry, CandidateSpec, CrossValidator, CVStrategy, Estimator, FittedModel, ModelKind, Predictor,
    };

    // Evaluation
    pub use crate::evaluation::{evaluate, ConfusionMatrix, EvaluatedRun, RunMetrics};

    // Experiment tracking
    pub use crate::tracking::{FileRunStore, RunRecord, RunReference, RunStore};

    // Pipeline
    pub use crate::pipeline::{CandidateOutcome, Pipeline, PipelineReport};

    // Inference
    pub use crate::inference::{InferenceAdapter, ModelBundle};
}
