//! Trainer/evaluator
//!
//! [`evaluate`] fits one candidate on the training rows of a [`Split`],
//! scores it on the held-out rows, cross-validates a fresh instance over the
//! full dataset, and returns everything needed to record the run.

mod confusion;
mod metrics;

pub use confusion::ConfusionMatrix;
pub use metrics::{accuracy, Averages, ClassMetrics, ClassificationReport};

use crate::dataset::{Dataset, LabelMap, Split};
use crate::error::{KolosalError, Result};
use crate::training::{
    cross_validate, CVResults, CandidateSpec, CrossValidator, FittedModel, Hyperparams, ModelKind,
    Predictor,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Names accepted by [`RunMetrics::get`]
pub const METRIC_NAMES: [&str; 6] = ["accuracy", "precision", "recall", "f1", "cv_mean", "cv_std"];

/// Held-out and cross-validated scores of one run. All values lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub accuracy: f64,
    /// Support-weighted precision
    pub precision: f64,
    /// Support-weighted recall
    pub recall: f64,
    /// Support-weighted F1
    pub f1: f64,
    pub cv_mean: f64,
    /// Population standard deviation of fold accuracies
    pub cv_std: f64,
}

impl RunMetrics {
    /// Held-out accuracy minus mean cross-validated accuracy
    pub fn cv_gap(&self) -> f64 {
        self.accuracy - self.cv_mean
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "accuracy" => Some(self.accuracy),
            "precision" => Some(self.precision),
            "recall" => Some(self.recall),
            "f1" => Some(self.f1),
            "cv_mean" => Some(self.cv_mean),
            "cv_std" => Some(self.cv_std),
            _ => None,
        }
    }
}

/// A fully evaluated candidate, not yet persisted
#[derive(Debug, Clone)]
pub struct EvaluatedRun {
    pub candidate_id: String,
    pub kind: ModelKind,
    /// Full resolved hyperparameters, defaults included
    pub params: Hyperparams,
    pub metrics: RunMetrics,
    pub cv: CVResults,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    pub model: FittedModel,
    pub feature_names: Vec<String>,
    pub label_map: LabelMap,
    pub split: Split,
    pub fit_seconds: f64,
}

/// Fit, score and cross-validate one candidate.
///
/// A candidate whose parameters cannot be resolved yields `ConfigError`;
/// any failure while fitting or predicting yields `FitError` for that
/// candidate only.
pub fn evaluate(
    candidate: &CandidateSpec,
    dataset: &Dataset,
    split: &Split,
    folds: &CrossValidator,
) -> Result<EvaluatedRun> {
    let estimator = candidate.build()?;
    let params = estimator.params();
    let fit_failed = |e: KolosalError| match e {
        KolosalError::ConfigError(_) | KolosalError::FitError { .. } => e,
        other => KolosalError::FitError {
            candidate: candidate.id.clone(),
            reason: other.to_string(),
        },
    };

    let (x_train, y_train) = dataset.select(&split.train_indices);
    let (x_test, y_test) = dataset.select(&split.test_indices);

    let started = Instant::now();
    let model = estimator
        .fit(&x_train, &y_train, dataset.n_classes())
        .map_err(fit_failed)?;
    let fit_seconds = started.elapsed().as_secs_f64();
    debug!(candidate = %candidate.id, fit_seconds, "candidate fitted");

    let predicted = model.predict(&x_test).map_err(fit_failed)?;
    let confusion = ConfusionMatrix::from_predictions(&y_test, &predicted, dataset.label_map())?;
    let report = ClassificationReport::from_confusion(&confusion);

    let cv = cross_validate(candidate, dataset, folds).map_err(fit_failed)?;

    let metrics = RunMetrics {
        accuracy: report.accuracy,
        precision: report.weighted_avg.precision,
        recall: report.weighted_avg.recall,
        f1: report.weighted_avg.f1,
        cv_mean: cv.mean_score,
        cv_std: cv.std_score,
    };

    info!(
        candidate = %candidate.id,
        accuracy = metrics.accuracy,
        f1 = metrics.f1,
        cv_mean = metrics.cv_mean,
        cv_std = metrics.cv_std,
        "candidate evaluated"
    );

    Ok(EvaluatedRun {
        candidate_id: candidate.id.clone(),
        kind: candidate.kind,
        params,
        metrics,
        cv,
        confusion,
        report,
        model,
        feature_names: dataset.feature_names().to_vec(),
        label_map: dataset.label_map().clone(),
        split: split.clone(),
        fit_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::split;
    use crate::training::CVStrategy;
    use serde_json::json;

    fn folds() -> CrossValidator {
        CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false })
    }

    #[test]
    fn test_evaluate_decision_tree() {
        let dataset = Dataset::reference().unwrap();
        let split = split(&dataset, 0.2, 42).unwrap();
        let candidate = CandidateSpec::new("tree", ModelKind::DecisionTree).with_param("random_state", json!(0));

        let run = evaluate(&candidate, &dataset, &split, &folds()).unwrap();
        assert_eq!(run.confusion.total(), split.n_test());
        assert_eq!(run.cv.n_folds, 3);
        assert!(run.metrics.accuracy > 0.8);
        for name in METRIC_NAMES {
            let v = run.metrics.get(name).unwrap();
            assert!((0.0..=1.0).contains(&v), "{} = {}", name, v);
        }
    }

    #[test]
    fn test_invalid_value_is_fit_error() {
        let dataset = Dataset::reference().unwrap();
        let split = split(&dataset, 0.2, 42).unwrap();
        let candidate = CandidateSpec::new("rf", ModelKind::RandomForest).with_param("n_estimators", json!(0));

        let err = evaluate(&candidate, &dataset, &split, &folds()).unwrap_err();
        assert!(matches!(err, KolosalError::FitError { ref candidate, .. } if candidate == "rf"));
    }

    #[test]
    fn test_unknown_param_is_config_error() {
        let dataset = Dataset::reference().unwrap();
        let split = split(&dataset, 0.2, 42).unwrap();
        let candidate = CandidateSpec::new("lr", ModelKind::LogisticRegression).with_param("solver", json!("lbfgs"));

        let err = evaluate(&candidate, &dataset, &split, &folds()).unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(_)));
    }

    #[test]
    fn test_cv_gap() {
        let m = RunMetrics {
            accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            cv_mean: 0.9,
            cv_std: 0.05,
        };
        assert!((m.cv_gap() - 0.1).abs() < 1e-12);
        assert_eq!(m.get("unknown"), None);
    }
}
