//! Pipeline configuration and run context

use crate::error::{KolosalError, Result};
use crate::training::{CVStrategy, CandidateRegistry, CrossValidator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one pipeline execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_fraction: f64,
    /// Seed for the train/test split
    pub seed: u64,
    /// Number of cross-validation folds, at least 2
    pub cv_folds: usize,
    /// Preserve class proportions in each fold
    pub cv_stratified: bool,
    /// Shuffle rows (seeded by `seed`) before assigning folds
    pub cv_shuffle: bool,
    pub experiment_name: String,
    pub tracking_dir: PathBuf,
    /// CSV source; the embedded reference dataset is used when unset
    pub data_path: Option<PathBuf>,
    pub target_column: String,
    pub candidates: CandidateRegistry,
    /// Log a warning when |accuracy - cv_mean| exceeds this
    pub gap_warning_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            cv_folds: 5,
            cv_stratified: true,
            cv_shuffle: false,
            experiment_name: "iris-model-comparison".to_string(),
            tracking_dir: PathBuf::from("./mlruns"),
            data_path: None,
            target_column: "species".to_string(),
            candidates: CandidateRegistry::default(),
            gap_warning_threshold: 0.05,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `KOLOSAL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Load a JSON document; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            KolosalError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            KolosalError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(dir) = std::env::var("KOLOSAL_TRACKING_DIR") {
            self.tracking_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("KOLOSAL_EXPERIMENT") {
            self.experiment_name = name;
        }
        if let Some(seed) = env_parse("KOLOSAL_SEED")? {
            self.seed = seed;
        }
        if let Some(folds) = env_parse("KOLOSAL_CV_FOLDS")? {
            self.cv_folds = folds;
        }
        if let Some(fraction) = env_parse("KOLOSAL_TEST_FRACTION")? {
            self.test_fraction = fraction;
        }
        Ok(self)
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn with_tracking_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tracking_dir = dir.into();
        self
    }

    pub fn with_candidates(mut self, candidates: CandidateRegistry) -> Self {
        self.candidates = candidates;
        self
    }

    /// Everything checkable before a model is fitted
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(KolosalError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.cv_folds < 2 {
            return Err(KolosalError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.experiment_name.trim().is_empty() {
            return Err(KolosalError::ConfigError("experiment_name must not be empty".to_string()));
        }
        if !(self.gap_warning_threshold >= 0.0) {
            return Err(KolosalError::ConfigError(format!(
                "gap_warning_threshold must be non-negative, got {}",
                self.gap_warning_threshold
            )));
        }
        self.candidates.validate()
    }

    pub fn cross_validator(&self) -> CrossValidator {
        let strategy = if self.cv_stratified {
            CVStrategy::StratifiedKFold { n_splits: self.cv_folds, shuffle: self.cv_shuffle }
        } else {
            CVStrategy::KFold { n_splits: self.cv_folds, shuffle: self.cv_shuffle }
        };
        CrossValidator::new(strategy).with_random_state(self.seed)
    }

    pub fn run_context(&self) -> RunContext {
        RunContext::new(self.experiment_name.clone(), self.tracking_dir.clone())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| KolosalError::ConfigError(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Where and under which experiment runs are recorded. Passed explicitly to
/// every pipeline execution; there is no process-wide tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub experiment_name: String,
    pub tracking_dir: PathBuf,
}

impl RunContext {
    pub fn new(experiment_name: impl Into<String>, tracking_dir: impl Into<PathBuf>) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            tracking_dir: tracking_dir.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.experiment_name.trim().is_empty() {
            return Err(KolosalError::ConfigError("experiment_name must not be empty".to_string()));
        }
        if self.tracking_dir.as_os_str().is_empty() {
            return Err(KolosalError::ConfigError("tracking_dir must not be empty".to_string()));
        }
        Ok(())
    }
}
