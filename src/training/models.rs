//! Model traits and the fitted-model wrapper

use super::decision_tree::DecisionTree;
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use super::registry::{Hyperparams, ModelKind};
use crate::error::{KolosalError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// The only capability inference needs: batch feature rows to label indices.
pub trait Predictor: Send + Sync {
    /// Number of feature columns the model was fit on
    fn n_features(&self) -> usize;

    /// Predict one class index per row
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>>;
}

/// A configured, not yet fitted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Estimator {
    pub fn kind(&self) -> ModelKind {
        match self {
            Estimator::LogisticRegression(_) => ModelKind::LogisticRegression,
            Estimator::DecisionTree(_) => ModelKind::DecisionTree,
            Estimator::RandomForest(_) => ModelKind::RandomForest,
        }
    }

    /// Full resolved hyperparameter set, defaults included
    pub fn params(&self) -> Hyperparams {
        match self {
            Estimator::LogisticRegression(m) => m.params(),
            Estimator::DecisionTree(m) => m.params(),
            Estimator::RandomForest(m) => m.params(),
        }
    }

    /// Consume the estimator and fit it. The result can no longer be refit.
    pub fn fit(self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<FittedModel> {
        if x.nrows() != y.len() {
            return Err(KolosalError::shape(
                format!("{} labels", x.nrows()),
                format!("{} labels", y.len()),
            ));
        }
        if x.nrows() == 0 {
            return Err(KolosalError::DataError("cannot fit on an empty training set".to_string()));
        }

        let inner = match self {
            Estimator::LogisticRegression(mut m) => {
                m.fit(x, y, n_classes)?;
                Estimator::LogisticRegression(m)
            }
            Estimator::DecisionTree(mut m) => {
                m.fit(x, y, n_classes)?;
                Estimator::DecisionTree(m)
            }
            Estimator::RandomForest(mut m) => {
                m.fit(x, y, n_classes)?;
                Estimator::RandomForest(m)
            }
        };

        Ok(FittedModel { inner })
    }
}

/// A fitted classifier. Only [`Estimator::fit`] produces one, and it exposes
/// prediction but no training surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    inner: Estimator,
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        self.inner.kind()
    }

    pub fn params(&self) -> Hyperparams {
        self.inner.params()
    }

    /// Number of classes the model can predict
    pub fn n_classes(&self) -> usize {
        match &self.inner {
            Estimator::LogisticRegression(m) => m.n_classes(),
            Estimator::DecisionTree(m) => m.n_classes(),
            Estimator::RandomForest(m) => m.n_classes(),
        }
    }
}

impl Predictor for FittedModel {
    fn n_features(&self) -> usize {
        match &self.inner {
            Estimator::LogisticRegression(m) => m.n_features(),
            Estimator::DecisionTree(m) => m.n_features(),
            Estimator::RandomForest(m) => m.n_features(),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        if x.ncols() != self.n_features() {
            return Err(KolosalError::shape(
                format!("{} features per row", self.n_features()),
                format!("{} features per row", x.ncols()),
            ));
        }
        match &self.inner {
            Estimator::LogisticRegression(m) => m.predict(x),
            Estimator::DecisionTree(m) => m.predict(x),
            Estimator::RandomForest(m) => m.predict(x),
        }
    }
}
