//! Linear classifiers

use super::argmax;
use super::registry::Hyperparams;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Multinomial logistic regression trained with full-batch gradient descent.
///
/// Features are standardized internally; the stored mean and scale are
/// applied again at prediction time. The L2 penalty follows the inverse
/// regularization convention: the per-sample strength is `1 / (c * n_samples)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Inverse regularization strength
    pub c: f64,
    /// Step size
    pub learning_rate: f64,
    /// Stop when the largest absolute gradient component falls below this
    pub tol: f64,
    /// Whether to fit per-class intercepts
    pub fit_intercept: bool,
    coefficients: Option<Array2<f64>>,
    intercepts: Option<Array1<f64>>,
    feature_mean: Option<Array1<f64>>,
    feature_scale: Option<Array1<f64>>,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            max_iter: 100,
            c: 1.0,
            learning_rate: 1.0,
            tol: 1e-4,
            fit_intercept: true,
            coefficients: None,
            intercepts: None,
            feature_mean: None,
            feature_scale: None,
            n_iter: 0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn params(&self) -> Hyperparams {
        let mut p = Hyperparams::new();
        p.insert("max_iter".to_string(), json!(self.max_iter));
        p.insert("c".to_string(), json!(self.c));
        p.insert("learning_rate".to_string(), json!(self.learning_rate));
        p.insert("tol".to_string(), json!(self.tol));
        p.insert("fit_intercept".to_string(), json!(self.fit_intercept));
        p
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |w| w.nrows())
    }

    pub fn n_classes(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |w| w.ncols())
    }

    /// Iterations actually run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(KolosalError::InvalidParameter {
                name: "max_iter".to_string(),
                value: self.max_iter.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(KolosalError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(KolosalError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        Ok(())
    }

    /// Fit on rows of `x` with class indices `y` in `[0, n_classes)`
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<&mut Self> {
        self.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_classes < 2 {
            return Err(KolosalError::DataError(format!(
                "logistic regression needs at least 2 classes, got {}",
                n_classes
            )));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| KolosalError::DataError("cannot standardize an empty matrix".to_string()))?;
        let scale = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let xs = (x - &mean) / &scale;

        let mut targets = Array2::<f64>::zeros((n_samples, n_classes));
        for (i, &class) in y.iter().enumerate() {
            if class >= n_classes {
                return Err(KolosalError::DataError(format!(
                    "label {} at row {} is outside [0, {})",
                    class, i, n_classes
                )));
            }
            targets[[i, class]] = 1.0;
        }

        let alpha = 1.0 / (self.c * n_samples as f64);
        let lr = self.learning_rate;
        let mut weights = Array2::<f64>::zeros((n_features, n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);

        self.n_iter = 0;
        for iter in 0..self.max_iter {
            self.n_iter = iter + 1;

            let mut probs = xs.dot(&weights) + &bias;
            softmax_rows(&mut probs);

            let errors = &probs - &targets;
            let grad_w = xs.t().dot(&errors) / n_samples as f64 + &(&weights * alpha);
            let grad_b = errors
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(n_classes));

            let mut grad_max = 0.0f64;
            for g in grad_w.iter().chain(grad_b.iter()) {
                if !g.is_finite() {
                    return Err(KolosalError::ConvergenceError { iterations: self.n_iter });
                }
                grad_max = grad_max.max(g.abs());
            }

            weights.scaled_add(-lr, &grad_w);
            if self.fit_intercept {
                bias.scaled_add(-lr, &grad_b);
            }

            if grad_max < self.tol {
                break;
            }
        }

        self.coefficients = Some(weights);
        self.intercepts = Some(bias);
        self.feature_mean = Some(mean);
        self.feature_scale = Some(scale);

        Ok(self)
    }

    /// Class probabilities, one row per sample
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(w), Some(b), Some(mean), Some(scale)) = (
            self.coefficients.as_ref(),
            self.intercepts.as_ref(),
            self.feature_mean.as_ref(),
            self.feature_scale.as_ref(),
        ) else {
            return Err(KolosalError::ModelNotFitted);
        };

        let xs = (x - mean) / scale;
        let mut probs = xs.dot(w) + b;
        softmax_rows(&mut probs);
        Ok(probs)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.rows().into_iter().map(argmax).collect())
    }
}

/// Numerically stable in-place softmax over each row
fn softmax_rows(logits: &mut Array2<f64>) {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_blobs() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0], [0.3, 0.1], [0.1, 0.4],
            [4.0, 0.0], [4.2, 0.3], [3.9, 0.2],
            [0.0, 4.0], [0.2, 4.1], [0.3, 3.8],
        ];
        (x, vec![0, 0, 0, 1, 1, 1, 2, 2, 2])
    }

    #[test]
    fn test_multiclass_fit() {
        let (x, y) = three_blobs();
        let mut model = LogisticRegression::new().with_max_iter(200);
        model.fit(&x, &y, 3).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.n_iter() <= 200);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = three_blobs();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y, 3).unwrap();
        let probs = model.predict_proba(&x).unwrap();
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_max_iter_is_invalid() {
        let (x, y) = three_blobs();
        let mut model = LogisticRegression::new().with_max_iter(0);
        let err = model.fit(&x, &y, 3).unwrap_err();
        assert!(matches!(err, KolosalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_nonpositive_c_is_invalid() {
        let (x, y) = three_blobs();
        let mut model = LogisticRegression::new().with_c(0.0);
        assert!(model.fit(&x, &y, 3).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0, 2.0]]),
            Err(KolosalError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_constant_feature_is_tolerated() {
        let x = array![[1.0, 0.0], [1.0, 0.1], [1.0, 5.0], [1.0, 5.1]];
        let y = vec![0, 0, 1, 1];
        let mut model = LogisticRegression::new();
        model.fit(&x, &y, 2).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_params_are_complete() {
        let params = LogisticRegression::new().with_max_iter(200).params();
        assert_eq!(params["max_iter"], json!(200));
        assert!(params.contains_key("c"));
        assert!(params.contains_key("fit_intercept"));
    }
}
