//! Inference adapter implementation

use super::ModelBundle;
use crate::dataset::LabelMap;
use crate::error::{KolosalError, Result};
use crate::training::Predictor;
use ndarray::Array2;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Maps batches of feature rows to display labels using one loaded model.
///
/// Cloning is cheap: the bundle is shared behind an `Arc` and never mutated,
/// so any number of callers may predict concurrently.
#[derive(Debug, Clone)]
pub struct InferenceAdapter {
    bundle: Arc<ModelBundle>,
}

impl InferenceAdapter {
    /// Load a bundle from disk once, at service start
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bundle = ModelBundle::load(path)?;
        info!(
            path = %path.display(),
            candidate = %bundle.candidate_id,
            kind = %bundle.kind,
            n_features = bundle.feature_names.len(),
            n_classes = bundle.label_map.len(),
            "model loaded"
        );
        Ok(Self::from_bundle(bundle))
    }

    pub fn from_bundle(bundle: ModelBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
        }
    }

    pub fn candidate_id(&self) -> &str {
        &self.bundle.candidate_id
    }

    pub fn feature_names(&self) -> &[String] {
        &self.bundle.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.bundle.feature_names.len()
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.bundle.label_map
    }

    /// One class index per row, in input order
    pub fn predict_indices(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>> {
        let x = self.to_matrix(rows)?;
        let indices = self.bundle.model.predict(&x)?;
        debug!(rows = rows.len(), "batch predicted");
        Ok(indices)
    }

    /// One display label per row, in input order. Fails as a whole on any
    /// malformed row or unmapped index.
    pub fn predict_labels(&self, rows: &[Vec<f64>]) -> Result<Vec<String>> {
        let label_map = &self.bundle.label_map;
        self.predict_indices(rows)?
            .into_iter()
            .map(|idx| {
                label_map.name(idx).map(str::to_owned).ok_or_else(|| {
                    KolosalError::shape(
                        format!("label index < {}", label_map.len()),
                        format!("predicted index {}", idx),
                    )
                })
            })
            .collect()
    }

    fn to_matrix(&self, rows: &[Vec<f64>]) -> Result<Array2<f64>> {
        let width = self.n_features();
        if rows.is_empty() {
            return Err(KolosalError::shape("at least one feature row", "an empty batch"));
        }

        let mut flat = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(KolosalError::shape(
                    format!("{} values per row", width),
                    format!("{} values in row {}", row.len(), i),
                ));
            }
            if let Some(v) = row.iter().find(|v| !v.is_finite()) {
                return Err(KolosalError::shape(
                    "finite feature values",
                    format!("{} in row {}", v, i),
                ));
            }
            flat.extend_from_slice(row);
        }

        Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| KolosalError::shape(format!("{} x {}", rows.len(), width), e.to_string()))
    }
}
