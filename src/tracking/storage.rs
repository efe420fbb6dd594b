//! File-system backend for run records
//!
//! ```text
//! <root>/<experiment_id>/experiment.json
//! <root>/<experiment_id>/<run_id>/run.json
//! <root>/<experiment_id>/<run_id>/artifacts/...
//! ```
//!
//! The experiment id is a name-based UUID, so every writer derives the same
//! directory without a shared index. Run directories are created with
//! `create_dir` and files with `create_new`, so an existing run can never be
//! overwritten. `run.json` is written to a temporary file and hard-linked
//! into place last; a run directory without a readable `run.json` is
//! incomplete and is skipped when listing.

use super::{ArtifactRefs, RunRecord, RunReference, RunStore};
use crate::config::RunContext;
use crate::error::{KolosalError, Result};
use crate::evaluation::EvaluatedRun;
use crate::inference::ModelBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const EXPERIMENT_FILE: &str = "experiment.json";
const RUN_FILE: &str = "run.json";

/// Namespace for name-based experiment ids
const EXPERIMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6b6f_6c6f_7361_6c2d_636c_6173_7369_6679);

/// Experiment metadata, written once when the experiment directory is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    pub experiment_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Local file system run store
#[derive(Debug, Clone)]
pub struct FileRunStore {
    root: PathBuf,
}

impl FileRunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_context(ctx: &RunContext) -> Self {
        Self::new(ctx.tracking_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dir(&self, experiment_id: &str) -> PathBuf {
        self.root.join(experiment_id)
    }

    /// Stable id for an experiment name, whether or not it exists yet
    pub fn experiment_id_for(experiment_name: &str) -> String {
        Uuid::new_v5(&EXPERIMENT_NAMESPACE, experiment_name.as_bytes())
            .simple()
            .to_string()
    }

    /// Id of an experiment that has at least been created
    pub fn experiment_id(&self, experiment_name: &str) -> Result<Option<String>> {
        let experiment_id = Self::experiment_id_for(experiment_name);
        let dir = self.experiment_dir(&experiment_id);
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(Some(experiment_id)),
            Ok(_) => Err(KolosalError::persistence(&dir, "not a directory")),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KolosalError::persistence(&dir, e)),
        }
    }

    /// Metadata of an existing experiment
    pub fn experiment(&self, experiment_name: &str) -> Result<Option<ExperimentInfo>> {
        let Some(experiment_id) = self.experiment_id(experiment_name)? else {
            return Ok(None);
        };
        let path = self.experiment_dir(&experiment_id).join(EXPERIMENT_FILE);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| KolosalError::persistence(&path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KolosalError::persistence(&path, e)),
        }
    }

    /// Create the experiment directory if missing. Every caller derives the
    /// same id; only the caller whose `create_dir` succeeds writes the metadata.
    fn ensure_experiment(&self, experiment_name: &str) -> Result<String> {
        fs::create_dir_all(&self.root).map_err(|e| KolosalError::persistence(&self.root, e))?;

        let experiment_id = Self::experiment_id_for(experiment_name);
        let dir = self.experiment_dir(&experiment_id);
        match fs::create_dir(&dir) {
            Ok(()) => {
                let info = ExperimentInfo {
                    experiment_id: experiment_id.clone(),
                    name: experiment_name.to_string(),
                    created_at: Utc::now(),
                };
                publish_new(&dir, EXPERIMENT_FILE, &serde_json::to_vec_pretty(&info)?)?;
                info!(experiment = %experiment_name, experiment_id = %experiment_id, "experiment created");
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) => return Err(KolosalError::persistence(&dir, e)),
        }
        Ok(experiment_id)
    }

    fn require_experiment(&self, experiment_name: &str) -> Result<String> {
        self.experiment_id(experiment_name)?.ok_or_else(|| {
            KolosalError::ConfigError(format!("unknown experiment '{}'", experiment_name))
        })
    }

    fn read_record(&self, path: &Path) -> Result<RunRecord> {
        let bytes = fs::read(path).map_err(|e| KolosalError::persistence(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| KolosalError::persistence(path, e))
    }
}

impl RunStore for FileRunStore {
    fn record(&self, experiment_name: &str, run: &EvaluatedRun) -> Result<RunReference> {
        let experiment_id = self.ensure_experiment(experiment_name)?;
        let experiment_dir = self.experiment_dir(&experiment_id);

        let run_id = Uuid::new_v4().simple().to_string();
        let run_dir = experiment_dir.join(&run_id);
        create_dir_new(&run_dir)?;
        create_dir_new(&run_dir.join("artifacts"))?;
        create_dir_new(&run_dir.join("artifacts").join("model"))?;

        let record = RunRecord::from_run(run, &experiment_id, &run_id, experiment_name);
        let refs: &ArtifactRefs = &record.artifacts;

        write_new(&run_dir.join(&refs.confusion_matrix_png), &run.confusion.to_png()?)?;
        write_new(
            &run_dir.join(&refs.confusion_matrix_json),
            &serde_json::to_vec_pretty(&run.confusion)?,
        )?;
        write_new(
            &run_dir.join(&refs.classification_report),
            &serde_json::to_vec_pretty(&run.report)?,
        )?;

        let bundle = ModelBundle::new(
            run.candidate_id.clone(),
            run.feature_names.clone(),
            run.label_map.clone(),
            run.model.clone(),
        )?;
        bundle.save_new(run_dir.join(&refs.model))?;

        publish_new(&run_dir, RUN_FILE, &serde_json::to_vec_pretty(&record)?)?;

        debug!(run_dir = %run_dir.display(), "run written");
        Ok(RunReference {
            experiment_id,
            run_id,
            run_dir,
        })
    }

    fn list_runs(&self, experiment_name: &str) -> Result<Vec<RunRecord>> {
        let Some(experiment_id) = self.experiment_id(experiment_name)? else {
            return Ok(Vec::new());
        };
        let experiment_dir = self.experiment_dir(&experiment_id);
        let entries = fs::read_dir(&experiment_dir).map_err(|e| KolosalError::persistence(&experiment_dir, e))?;

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| KolosalError::persistence(&experiment_dir, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_file = entry.path().join(RUN_FILE);
            if !run_file.is_file() {
                warn!(run_dir = %entry.path().display(), "skipping incomplete run");
                continue;
            }
            match self.read_record(&run_file) {
                Ok(record) => runs.push(record),
                Err(e) => warn!(run_file = %run_file.display(), error = %e, "skipping unreadable run"),
            }
        }

        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    fn load_run(&self, experiment_name: &str, run_id: &str) -> Result<RunRecord> {
        let experiment_id = self.require_experiment(experiment_name)?;
        let path = self.experiment_dir(&experiment_id).join(run_id).join(RUN_FILE);
        self.read_record(&path)
    }

    fn reference(&self, record: &RunRecord) -> RunReference {
        RunReference {
            experiment_id: record.experiment_id.clone(),
            run_id: record.run_id.clone(),
            run_dir: self.experiment_dir(&record.experiment_id).join(&record.run_id),
        }
    }

    fn load_bundle(&self, reference: &RunReference) -> Result<ModelBundle> {
        ModelBundle::load(reference.model_path())
    }
}

fn create_dir_new(path: &Path) -> Result<()> {
    fs::create_dir(path).map_err(|e| KolosalError::persistence(path, e))
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| KolosalError::persistence(path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| KolosalError::persistence(path, e))
}

/// Write `dir/name` so readers see either nothing or the complete file.
/// The content goes to a temporary file first and is hard-linked into
/// place; the link fails if `name` already exists.
fn publish_new(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let target = dir.join(name);
    let tmp = dir.join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));
    write_new(&tmp, bytes)?;

    let linked = fs::hard_link(&tmp, &target);
    if let Err(e) = fs::remove_file(&tmp) {
        warn!(path = %tmp.display(), error = %e, "could not remove temporary file");
    }
    linked.map_err(|e| KolosalError::persistence(&target, e))
}
