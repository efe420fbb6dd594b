//! Experiment pipeline
//!
//! Dataset, split, then for each candidate in turn: evaluate and record.
//! A candidate that fails to fit or to persist does not stop the others.

use crate::config::{PipelineConfig, RunContext};
use crate::dataset::{split, Dataset};
use crate::error::Result;
use crate::evaluation::{evaluate, RunMetrics};
use crate::tracking::{FileRunStore, RunReference, RunStore};
use serde::Serialize;
use tracing::{error, info, warn};

/// What happened to one candidate
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Recorded {
        candidate_id: String,
        metrics: RunMetrics,
        reference: RunReference,
    },
    FitFailed {
        candidate_id: String,
        error: String,
    },
    /// Evaluated, but the run could not be written
    PersistFailed {
        candidate_id: String,
        metrics: RunMetrics,
        error: String,
    },
}

impl CandidateOutcome {
    pub fn candidate_id(&self) -> &str {
        match self {
            CandidateOutcome::Recorded { candidate_id, .. }
            | CandidateOutcome::FitFailed { candidate_id, .. }
            | CandidateOutcome::PersistFailed { candidate_id, .. } => candidate_id,
        }
    }

    pub fn metrics(&self) -> Option<&RunMetrics> {
        match self {
            CandidateOutcome::Recorded { metrics, .. } | CandidateOutcome::PersistFailed { metrics, .. } => {
                Some(metrics)
            }
            CandidateOutcome::FitFailed { .. } => None,
        }
    }

    pub fn reference(&self) -> Option<&RunReference> {
        match self {
            CandidateOutcome::Recorded { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

/// Result of one pipeline execution
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub experiment_name: String,
    pub outcomes: Vec<CandidateOutcome>,
}

impl PipelineReport {
    /// Every candidate was evaluated and durably recorded
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, CandidateOutcome::Recorded { .. }))
    }

    pub fn recorded(&self) -> impl Iterator<Item = &RunReference> {
        self.outcomes.iter().filter_map(CandidateOutcome::reference)
    }

    pub fn outcome(&self, candidate_id: &str) -> Option<&CandidateOutcome> {
        self.outcomes.iter().find(|o| o.candidate_id() == candidate_id)
    }
}

/// Sequential fit/evaluate/record loop over the configured candidates
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The configured CSV, or the embedded reference dataset
    pub fn load_dataset(&self) -> Result<Dataset> {
        match &self.config.data_path {
            Some(path) => Dataset::from_csv(path, &self.config.target_column),
            None => Dataset::reference(),
        }
    }

    /// Run against a file store rooted at `ctx.tracking_dir`
    pub fn run(&self, ctx: &RunContext) -> Result<PipelineReport> {
        let dataset = self.load_dataset()?;
        let store = FileRunStore::from_context(ctx);
        self.run_with(&dataset, ctx, &store)
    }

    /// Configuration errors are returned before any candidate is fitted.
    /// Per-candidate failures are reported in the returned [`PipelineReport`].
    pub fn run_with(&self, dataset: &Dataset, ctx: &RunContext, store: &dyn RunStore) -> Result<PipelineReport> {
        let config = &self.config;
        config.validate()?;
        ctx.validate()?;

        let split = split(dataset, config.test_fraction, config.seed)?;
        let folds = config.cross_validator();
        folds.split(dataset.labels())?;

        info!(
            experiment = %ctx.experiment_name,
            rows = dataset.n_rows(),
            n_train = split.n_train(),
            n_test = split.n_test(),
            cv_folds = config.cv_folds,
            candidates = config.candidates.len(),
            "pipeline started"
        );

        let mut outcomes = Vec::with_capacity(config.candidates.len());
        for candidate in config.candidates.iter() {
            let run = match evaluate(candidate, dataset, &split, &folds) {
                Ok(run) => run,
                Err(e) => {
                    error!(candidate = %candidate.id, error = %e, "candidate failed");
                    outcomes.push(CandidateOutcome::FitFailed {
                        candidate_id: candidate.id.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let gap = run.metrics.cv_gap();
            if gap.abs() > config.gap_warning_threshold {
                warn!(
                    candidate = %candidate.id,
                    accuracy = run.metrics.accuracy,
                    cv_mean = run.metrics.cv_mean,
                    gap,
                    "held-out accuracy and cross-validation disagree"
                );
            }

            let outcome = match store.record(&ctx.experiment_name, &run) {
                Ok(reference) => {
                    info!(
                        candidate = %candidate.id,
                        run_id = %reference.run_id,
                        experiment_id = %reference.experiment_id,
                        "run recorded"
                    );
                    CandidateOutcome::Recorded {
                        candidate_id: candidate.id.clone(),
                        metrics: run.metrics,
                        reference,
                    }
                }
                Err(e) => {
                    error!(candidate = %candidate.id, error = %e, "run not persisted");
                    CandidateOutcome::PersistFailed {
                        candidate_id: candidate.id.clone(),
                        metrics: run.metrics,
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = PipelineReport {
            experiment_name: ctx.experiment_name.clone(),
            outcomes,
        };
        if report.is_complete() {
            info!(experiment = %ctx.experiment_name, "pipeline finished");
        } else {
            warn!(experiment = %ctx.experiment_name, "pipeline finished with failures");
        }
        Ok(report)
    }
}
