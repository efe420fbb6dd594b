//! Dataset provider
//!
//! Supplies a labeled tabular dataset: a row-major feature matrix, integer
//! class labels in `[0, C)`, and the [`LabelMap`] naming each class.
//! The embedded reference dataset is available through [`Dataset::reference`];
//! arbitrary CSV files go through [`Dataset::from_csv`].

mod loader;
mod split;

pub use split::{split, split_indices, Split};

use crate::error::{KolosalError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const REFERENCE_CSV: &str = include_str!("../../data/iris.csv");
const REFERENCE_TARGET: &str = "species";

/// Fixed mapping from class index to display name.
///
/// The same map is used to annotate confusion matrices and to translate
/// predictions at inference time. It is persisted next to every fitted
/// model so the two can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Build a map where index `i` is named `names[i]`
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(KolosalError::DataError("label map must contain at least one class".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(KolosalError::DataError(format!("duplicate class name '{}'", name)));
            }
        }
        Ok(Self { names })
    }

    /// Display name for a class index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Class index for a display name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Immutable labeled dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Array2<f64>,
    labels: Vec<usize>,
    label_map: LabelMap,
}

impl Dataset {
    /// Create a dataset, validating shape and label range
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        labels: Vec<usize>,
        label_map: LabelMap,
    ) -> Result<Self> {
        let (n_rows, n_cols) = features.dim();

        if n_rows == 0 {
            return Err(KolosalError::DataError("dataset has no rows".to_string()));
        }
        if n_cols != feature_names.len() {
            return Err(KolosalError::shape(
                format!("{} feature columns", feature_names.len()),
                format!("{} columns in feature matrix", n_cols),
            ));
        }
        if labels.len() != n_rows {
            return Err(KolosalError::shape(
                format!("{} labels", n_rows),
                format!("{} labels", labels.len()),
            ));
        }
        if let Some(bad) = labels.iter().find(|&&l| l >= label_map.len()) {
            return Err(KolosalError::DataError(format!(
                "label {} is outside the {} known classes",
                bad,
                label_map.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(KolosalError::DataError("feature matrix contains non-finite values".to_string()));
        }

        Ok(Self {
            feature_names,
            features,
            labels,
            label_map,
        })
    }

    /// The embedded 150-row, 4-feature, 3-class reference dataset
    pub fn reference() -> Result<Self> {
        let df = loader::read_csv_bytes(REFERENCE_CSV.as_bytes())?;
        loader::dataset_from_frame(&df, REFERENCE_TARGET)
    }

    /// Load a CSV file with numeric feature columns and a target column
    pub fn from_csv(path: impl AsRef<Path>, target_column: &str) -> Result<Self> {
        let df = loader::read_csv_path(path.as_ref())?;
        loader::dataset_from_frame(&df, target_column)
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.label_map.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    /// Copy out the given rows as a `(features, labels)` pair
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Vec<usize>) {
        let x = self.features.select(Axis(0), indices);
        let y = indices.iter().map(|&i| self.labels[i]).collect();
        (x, y)
    }

    /// Row count per class index
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_reference_dataset_shape() {
        let ds = Dataset::reference().unwrap();
        assert_eq!(ds.n_rows(), 150);
        assert_eq!(ds.n_features(), 4);
        assert_eq!(ds.n_classes(), 3);
        assert_eq!(ds.label_map().names(), &["setosa", "versicolor", "virginica"]);
        assert_eq!(ds.feature_names()[0], "sepal length (cm)");
    }

    #[test]
    fn test_reference_dataset_is_balanced() {
        let ds = Dataset::reference().unwrap();
        let counts = ds.class_counts();
        assert_eq!(counts.values().copied().collect::<Vec<_>>(), vec![50, 50, 50]);
    }

    #[test]
    fn test_reference_first_row() {
        let ds = Dataset::reference().unwrap();
        let row = ds.features().row(0);
        assert_eq!(row.to_vec(), vec![5.1, 3.5, 1.4, 0.2]);
        assert_eq!(ds.labels()[0], 0);
    }

    #[test]
    fn test_new_rejects_out_of_range_label() {
        let map = LabelMap::new(["a", "b"]).unwrap();
        let result = Dataset::new(
            vec!["x".to_string()],
            array![[1.0], [2.0]],
            vec![0, 2],
            map,
        );
        assert!(matches!(result, Err(KolosalError::DataError(_))));
    }

    #[test]
    fn test_new_rejects_label_count_mismatch() {
        let map = LabelMap::new(["a", "b"]).unwrap();
        let result = Dataset::new(vec!["x".to_string()], array![[1.0], [2.0]], vec![0], map);
        assert!(matches!(result, Err(KolosalError::DataShapeError { .. })));
    }

    #[test]
    fn test_label_map_rejects_duplicates() {
        assert!(LabelMap::new(["a", "a"]).is_err());
        assert!(LabelMap::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_select_rows() {
        let map = LabelMap::new(["a", "b"]).unwrap();
        let ds = Dataset::new(
            vec!["x".to_string(), "y".to_string()],
            array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]],
            vec![0, 1, 0],
            map,
        )
        .unwrap();
        let (x, y) = ds.select(&[2, 0]);
        assert_eq!(x, array![[3.0, 30.0], [1.0, 10.0]]);
        assert_eq!(y, vec![0, 0]);
    }
}
