//! Persisted model artifact

use crate::dataset::LabelMap;
use crate::error::{KolosalError, Result};
use crate::training::{FittedModel, ModelKind, Predictor};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Bundle layout version written by this crate
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// A fitted model together with the schema and label names it was trained on.
/// The label map always travels with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub candidate_id: String,
    pub kind: ModelKind,
    pub feature_names: Vec<String>,
    pub label_map: LabelMap,
    pub model: FittedModel,
}

impl ModelBundle {
    pub fn new(
        candidate_id: impl Into<String>,
        feature_names: Vec<String>,
        label_map: LabelMap,
        model: FittedModel,
    ) -> Result<Self> {
        let bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            candidate_id: candidate_id.into(),
            kind: model.kind(),
            feature_names,
            label_map,
            model,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check internal consistency of a built or freshly loaded bundle
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(KolosalError::SerializationError(format!(
                "unsupported model bundle version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }
        if self.feature_names.len() != self.model.n_features() {
            return Err(KolosalError::shape(
                format!("{} feature names", self.model.n_features()),
                format!("{} feature names", self.feature_names.len()),
            ));
        }
        if self.label_map.is_empty() {
            return Err(KolosalError::DataError("model bundle has an empty label map".to_string()));
        }
        if self.label_map.len() != self.model.n_classes() {
            return Err(KolosalError::shape(
                format!("{} class names", self.model.n_classes()),
                format!("{} class names", self.label_map.len()),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let bundle: Self = serde_json::from_slice(bytes)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Read and validate a bundle file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| KolosalError::persistence(path, e))?;
        Self::from_json(&bytes)
    }

    /// Write to a new file; an existing file is never replaced
    pub fn save_new(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_json()?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| KolosalError::persistence(path, e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| KolosalError::persistence(path, e))
    }
}
