//! Cross-validation implementations

use super::registry::CandidateSpec;
use super::Predictor;
use crate::dataset::Dataset;
use crate::error::{KolosalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false }
    }
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => *n_splits,
        }
    }

    /// Same strategy with a different fold count
    pub fn with_n_splits(self, n: usize) -> Self {
        match self {
            CVStrategy::KFold { shuffle, .. } => CVStrategy::KFold { n_splits: n, shuffle },
            CVStrategy::StratifiedKFold { shuffle, .. } => CVStrategy::StratifiedKFold { n_splits: n, shuffle },
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Generate train/test splits over `labels.len()` rows
    pub fn split(&self, labels: &[usize]) -> Result<Vec<CVSplit>> {
        let n_samples = labels.len();
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(KolosalError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                n_splits
            )));
        }
        if n_samples < n_splits {
            return Err(KolosalError::ConfigError(format!(
                "n_samples ({}) must be >= cv_folds ({})",
                n_samples, n_splits
            )));
        }

        let folds = match self.strategy {
            CVStrategy::KFold { shuffle, .. } => self.k_fold(n_samples, n_splits, shuffle),
            CVStrategy::StratifiedKFold { shuffle, .. } => {
                self.stratified_k_fold(labels, n_splits, shuffle)
            }
        };

        let mut splits = Vec::with_capacity(n_splits);
        for (fold_idx, fold) in folds.iter().enumerate() {
            if fold.is_empty() {
                return Err(KolosalError::ConfigError(format!(
                    "fold {} of {} is empty",
                    fold_idx, n_splits
                )));
            }
            let mut test_indices = fold.clone();
            test_indices.sort_unstable();
            let mut train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            train_indices.sort_unstable();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }

    fn k_fold(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut folds = Vec::with_capacity(n_splits);
        let mut current = 0;
        for i in 0..n_splits {
            let size = if i < remainder { base + 1 } else { base };
            folds.push(indices[current..current + size].to_vec());
            current += size;
        }
        folds
    }

    fn stratified_k_fold(&self, labels: &[usize], n_splits: usize, shuffle: bool) -> Vec<Vec<usize>> {
        let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &class) in labels.iter().enumerate() {
            class_indices.entry(class).or_default().push(idx);
        }

        if shuffle {
            let mut rng = self.rng();
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin, continuing where the previous class stopped
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut next = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[next % n_splits].push(idx);
                next += 1;
            }
        }
        folds
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Population standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}

/// Accuracy of a fresh `candidate` instance on every fold of the full dataset
pub fn cross_validate(
    candidate: &CandidateSpec,
    dataset: &Dataset,
    validator: &CrossValidator,
) -> Result<CVResults> {
    let splits = validator.split(dataset.labels())?;
    let mut scores = Vec::with_capacity(splits.len());

    for fold in &splits {
        let (x_train, y_train) = dataset.select(&fold.train_indices);
        let (x_test, y_test) = dataset.select(&fold.test_indices);

        let model = candidate.build()?.fit(&x_train, &y_train, dataset.n_classes())?;
        let predicted = model.predict(&x_test)?;

        let correct = predicted.iter().zip(&y_test).filter(|(p, t)| p == t).count();
        let score = correct as f64 / y_test.len() as f64;
        tracing::debug!(candidate = %candidate.id, fold = fold.fold_idx, score, "fold scored");
        scores.push(score);
    }

    Ok(CVResults::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false });
        let labels = vec![0; 100];
        let splits = cv.split(&labels).unwrap();

        assert_eq!(splits.len(), 5);

        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_k_fold() {
        let labels = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false });
        let splits = cv.split(&labels).unwrap();

        assert_eq!(splits.len(), 5);

        // One sample of each class per fold
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let classes: Vec<usize> = split.test_indices.iter().map(|&i| labels[i]).collect();
            assert!(classes.contains(&0) && classes.contains(&1));
        }
    }

    #[test]
    fn test_shuffled_folds_are_reproducible() {
        let labels: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let strategy = CVStrategy::StratifiedKFold { n_splits: 3, shuffle: true };
        let a = CrossValidator::new(strategy).with_random_state(1).split(&labels).unwrap();
        let b = CrossValidator::new(strategy).with_random_state(1).split(&labels).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.test_indices, y.test_indices);
        }
    }

    #[test]
    fn test_too_few_folds() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 1, shuffle: false });
        assert!(matches!(cv.split(&[0, 1, 0]), Err(KolosalError::ConfigError(_))));
    }

    #[test]
    fn test_more_folds_than_samples() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false });
        assert!(cv.split(&[0, 1, 0]).is_err());
    }

    #[test]
    fn test_population_std() {
        let results = CVResults::from_scores(vec![1.0, 0.0]);
        assert_eq!(results.mean_score, 0.5);
        assert_eq!(results.std_score, 0.5);
        assert_eq!(results.n_folds, 2);
    }

    #[test]
    fn test_strategy_serde_shape() {
        let json = serde_json::to_value(CVStrategy::default()).unwrap();
        assert_eq!(json["type"], "stratified_k_fold");
        assert_eq!(json["n_splits"], 5);
    }
}
