//! Model training module
//!
//! Provides the classifiers a pipeline can compare:
//! - Multinomial logistic regression
//! - CART decision trees
//! - Random forests
//!
//! An [`Estimator`] is a configured, unfitted model. [`Estimator::fit`]
//! consumes it and yields a [`FittedModel`], which only exposes the
//! [`Predictor`] capability.

mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod linear_models;
pub mod random_forest;
pub mod registry;

pub use cross_validation::{cross_validate, CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use linear_models::LogisticRegression;
pub use models::{Estimator, FittedModel, Predictor};
pub use random_forest::{MaxFeatures, RandomForest};
pub use registry::{CandidateRegistry, CandidateSpec, Hyperparams, ModelKind};

use ndarray::ArrayView1;

/// Index of the largest value; ties resolve to the lowest index
pub(crate) fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_first_on_tie() {
        assert_eq!(argmax(array![0.2, 0.4, 0.4].view()), 1);
        assert_eq!(argmax(array![1.0].view()), 0);
    }
}
