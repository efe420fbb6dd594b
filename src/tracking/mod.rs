//! Run recorder
//!
//! Persists each evaluated candidate as an immutable run: hyperparameters,
//! metrics, confusion matrix, classification report and the model bundle.
//! Runs are grouped by experiment and addressed by `(experiment_id, run_id)`.

mod storage;

pub use storage::{ExperimentInfo, FileRunStore};

use crate::error::{KolosalError, Result};
use crate::evaluation::{EvaluatedRun, RunMetrics, METRIC_NAMES};
use crate::inference::ModelBundle;
use crate::training::{Hyperparams, ModelKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Artifact paths relative to the run directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRefs {
    pub confusion_matrix_png: String,
    pub confusion_matrix_json: String,
    pub classification_report: String,
    pub model: String,
}

impl Default for ArtifactRefs {
    fn default() -> Self {
        Self {
            confusion_matrix_png: "artifacts/confusion_matrix.png".to_string(),
            confusion_matrix_json: "artifacts/confusion_matrix.json".to_string(),
            classification_report: "artifacts/classification_report.json".to_string(),
            model: "artifacts/model/model.json".to_string(),
        }
    }
}

/// Metadata of one recorded run, written once as `run.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment_id: String,
    pub experiment_name: String,
    pub candidate_id: String,
    pub model_kind: ModelKind,
    pub params: Hyperparams,
    pub metrics: RunMetrics,
    pub cv_scores: Vec<f64>,
    pub test_fraction: f64,
    pub seed: u64,
    pub n_train: usize,
    pub n_test: usize,
    pub fit_seconds: f64,
    pub created_at: DateTime<Utc>,
    pub artifacts: ArtifactRefs,
}

impl RunRecord {
    pub(crate) fn from_run(run: &EvaluatedRun, experiment_id: &str, run_id: &str, experiment_name: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            experiment_id: experiment_id.to_string(),
            experiment_name: experiment_name.to_string(),
            candidate_id: run.candidate_id.clone(),
            model_kind: run.kind,
            params: run.params.clone(),
            metrics: run.metrics,
            cv_scores: run.cv.scores.clone(),
            test_fraction: run.split.test_fraction,
            seed: run.split.seed,
            n_train: run.split.n_train(),
            n_test: run.split.n_test(),
            fit_seconds: run.fit_seconds,
            created_at: Utc::now(),
            artifacts: ArtifactRefs::default(),
        }
    }
}

/// Address of a persisted run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReference {
    pub experiment_id: String,
    pub run_id: String,
    pub run_dir: PathBuf,
}

impl RunReference {
    pub fn model_path(&self) -> PathBuf {
        self.run_dir.join(ArtifactRefs::default().model)
    }
}

/// Durable home for run records
pub trait RunStore: Send + Sync {
    /// Persist a new run. Never overwrites an existing record.
    fn record(&self, experiment_name: &str, run: &EvaluatedRun) -> Result<RunReference>;

    /// All complete runs of an experiment, oldest first
    fn list_runs(&self, experiment_name: &str) -> Result<Vec<RunRecord>>;

    fn load_run(&self, experiment_name: &str, run_id: &str) -> Result<RunRecord>;

    fn reference(&self, record: &RunRecord) -> RunReference;

    fn load_bundle(&self, reference: &RunReference) -> Result<ModelBundle>;

    /// Run with the highest value of `metric`; `cv_std` ranks lowest first
    fn best_run(&self, experiment_name: &str, metric: &str) -> Result<Option<RunRecord>> {
        if !METRIC_NAMES.contains(&metric) {
            return Err(KolosalError::ConfigError(format!(
                "unknown metric '{}', expected one of {}",
                metric,
                METRIC_NAMES.join(", ")
            )));
        }
        let lower_is_better = metric == "cv_std";
        let score = |r: &RunRecord| r.metrics.get(metric).unwrap_or(f64::NAN);

        Ok(self.list_runs(experiment_name)?.into_iter().fold(None, |best, run| match best {
            None => Some(run),
            Some(b) => {
                let better = if lower_is_better {
                    score(&run) < score(&b)
                } else {
                    score(&run) > score(&b)
                };
                Some(if better { run } else { b })
            }
        }))
    }
}
