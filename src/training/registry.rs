//! Candidate registry: model identifiers mapped to configured, unfitted estimators

use super::decision_tree::{Criterion, DecisionTree};
use super::linear_models::LogisticRegression;
use super::models::Estimator;
use super::random_forest::{MaxFeatures, RandomForest};
use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Hyperparameter name to value, recorded verbatim with each run
pub type Hyperparams = BTreeMap<String, Value>;

/// Supported classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate entered into the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub id: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub params: Hyperparams,
}

impl CandidateSpec {
    pub fn new(id: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            id: id.into(),
            kind,
            params: Hyperparams::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Build a fresh unfitted estimator. Unknown or mistyped parameters are
    /// configuration errors; values are range-checked later, at fit time.
    pub fn build(&self) -> Result<Estimator> {
        let mut reader = ParamReader::new(&self.id, &self.params);

        let estimator = match self.kind {
            ModelKind::LogisticRegression => {
                let mut m = LogisticRegression::new();
                if let Some(v) = reader.usize("max_iter")? {
                    m = m.with_max_iter(v);
                }
                if let Some(v) = reader.f64("c")? {
                    m = m.with_c(v);
                }
                if let Some(v) = reader.f64("learning_rate")? {
                    m = m.with_learning_rate(v);
                }
                if let Some(v) = reader.f64("tol")? {
                    m = m.with_tol(v);
                }
                if let Some(v) = reader.bool("fit_intercept")? {
                    m = m.with_fit_intercept(v);
                }
                Estimator::LogisticRegression(m)
            }
            ModelKind::DecisionTree => {
                let mut m = DecisionTree::new();
                if let Some(v) = reader.usize("max_depth")? {
                    m = m.with_max_depth(v);
                }
                if let Some(v) = reader.usize("min_samples_split")? {
                    m = m.with_min_samples_split(v);
                }
                if let Some(v) = reader.usize("min_samples_leaf")? {
                    m = m.with_min_samples_leaf(v);
                }
                if let Some(v) = reader.usize("max_features")? {
                    m = m.with_max_features(v);
                }
                if let Some(v) = reader.criterion()? {
                    m = m.with_criterion(v);
                }
                if let Some(v) = reader.u64("random_state")? {
                    m = m.with_random_state(v);
                }
                Estimator::DecisionTree(m)
            }
            ModelKind::RandomForest => {
                let mut m = RandomForest::default();
                if let Some(v) = reader.usize("n_estimators")? {
                    m.n_estimators = v;
                }
                if let Some(v) = reader.usize("max_depth")? {
                    m = m.with_max_depth(v);
                }
                if let Some(v) = reader.usize("min_samples_split")? {
                    m = m.with_min_samples_split(v);
                }
                if let Some(v) = reader.usize("min_samples_leaf")? {
                    m = m.with_min_samples_leaf(v);
                }
                if let Some(v) = reader.max_features()? {
                    m = m.with_max_features(v);
                }
                if let Some(v) = reader.bool("bootstrap")? {
                    m = m.with_bootstrap(v);
                }
                if let Some(v) = reader.criterion()? {
                    m = m.with_criterion(v);
                }
                if let Some(v) = reader.u64("random_state")? {
                    m = m.with_random_state(v);
                }
                Estimator::RandomForest(m)
            }
        };

        reader.finish(self.kind)?;
        Ok(estimator)
    }
}

/// Consumes parameters by name and reports whatever was left unread.
/// A JSON `null` counts as "use the default".
struct ParamReader<'a> {
    candidate: &'a str,
    remaining: BTreeMap<&'a str, &'a Value>,
}

impl<'a> ParamReader<'a> {
    fn new(candidate: &'a str, params: &'a Hyperparams) -> Self {
        Self {
            candidate,
            remaining: params.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        }
    }

    fn take(&mut self, name: &str) -> Option<&'a Value> {
        self.remaining.remove(name).filter(|v| !v.is_null())
    }

    fn mistyped(&self, name: &str, expected: &str, value: &Value) -> KolosalError {
        KolosalError::ConfigError(format!(
            "candidate '{}': parameter '{}' must be {}, got {}",
            self.candidate, name, expected, value
        ))
    }

    fn u64(&mut self, name: &str) -> Result<Option<u64>> {
        match self.take(name) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.mistyped(name, "a non-negative integer", v)),
        }
    }

    fn usize(&mut self, name: &str) -> Result<Option<usize>> {
        Ok(self.u64(name)?.map(|v| v as usize))
    }

    fn f64(&mut self, name: &str) -> Result<Option<f64>> {
        match self.take(name) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| self.mistyped(name, "a number", v)),
        }
    }

    fn bool(&mut self, name: &str) -> Result<Option<bool>> {
        match self.take(name) {
            None => Ok(None),
            Some(v) => v.as_bool().map(Some).ok_or_else(|| self.mistyped(name, "a boolean", v)),
        }
    }

    fn criterion(&mut self) -> Result<Option<Criterion>> {
        match self.take("criterion") {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .and_then(Criterion::parse)
                .map(Some)
                .ok_or_else(|| self.mistyped("criterion", "\"gini\" or \"entropy\"", v)),
        }
    }

    fn max_features(&mut self) -> Result<Option<MaxFeatures>> {
        match self.take("max_features") {
            None => Ok(None),
            Some(v) => {
                let parsed = match v {
                    Value::String(s) => MaxFeatures::parse(s),
                    Value::Number(n) => n.as_u64().map(|n| MaxFeatures::Fixed(n as usize)),
                    _ => None,
                };
                parsed
                    .map(Some)
                    .ok_or_else(|| self.mistyped("max_features", "\"sqrt\", \"log2\", \"all\" or an integer", v))
            }
        }
    }

    fn finish(self, kind: ModelKind) -> Result<()> {
        if self.remaining.is_empty() {
            return Ok(());
        }
        let unknown: Vec<&str> = self.remaining.keys().copied().collect();
        Err(KolosalError::ConfigError(format!(
            "candidate '{}': unknown {} parameter(s): {}",
            self.candidate,
            kind,
            unknown.join(", ")
        )))
    }
}

/// Ordered, uniquely keyed set of candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateRegistry {
    candidates: Vec<CandidateSpec>,
}

impl Default for CandidateRegistry {
    fn default() -> Self {
        Self {
            candidates: vec![
                CandidateSpec::new("LogisticRegression", ModelKind::LogisticRegression)
                    .with_param("max_iter", json!(200)),
                CandidateSpec::new("RandomForest", ModelKind::RandomForest)
                    .with_param("n_estimators", json!(100))
                    .with_param("random_state", json!(42)),
            ],
        }
    }
}

impl CandidateRegistry {
    pub fn empty() -> Self {
        Self { candidates: Vec::new() }
    }

    /// Add a candidate; ids must stay unique
    pub fn register(&mut self, spec: CandidateSpec) -> Result<()> {
        if self.get(&spec.id).is_some() {
            return Err(KolosalError::ConfigError(format!(
                "duplicate candidate id '{}'",
                spec.id
            )));
        }
        self.candidates.push(spec);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CandidateSpec> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateSpec> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Reject empty or duplicate ids and unknown/mistyped parameters
    pub fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(KolosalError::ConfigError("candidate registry is empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for spec in &self.candidates {
            if spec.id.trim().is_empty() {
                return Err(KolosalError::ConfigError("candidate id must not be empty".to_string()));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(KolosalError::ConfigError(format!(
                    "duplicate candidate id '{}'",
                    spec.id
                )));
            }
            spec.build()?;
        }
        Ok(())
    }
}

impl FromIterator<CandidateSpec> for CandidateRegistry {
    fn from_iter<I: IntoIterator<Item = CandidateSpec>>(iter: I) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = CandidateRegistry::default();
        assert_eq!(registry.len(), 2);
        registry.validate().unwrap();

        let lr = registry.get("LogisticRegression").unwrap().build().unwrap();
        assert_eq!(lr.params()["max_iter"], json!(200));

        let rf = registry.get("RandomForest").unwrap().build().unwrap();
        assert_eq!(rf.kind(), ModelKind::RandomForest);
        assert_eq!(rf.params()["n_estimators"], json!(100));
        assert_eq!(rf.params()["random_state"], json!(42));
    }

    #[test]
    fn test_resolved_params_include_defaults() {
        let spec = CandidateSpec::new("tree", ModelKind::DecisionTree).with_param("max_depth", json!(3));
        let params = spec.build().unwrap().params();
        assert_eq!(params["max_depth"], json!(3));
        assert_eq!(params["criterion"], json!("gini"));
        assert!(params.contains_key("min_samples_leaf"));
    }

    #[test]
    fn test_unknown_param_is_config_error() {
        let spec = CandidateSpec::new("lr", ModelKind::LogisticRegression).with_param("penalty", json!("l1"));
        let err = spec.build().unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(ref m) if m.contains("penalty")));
    }

    #[test]
    fn test_mistyped_param_is_config_error() {
        let spec = CandidateSpec::new("rf", ModelKind::RandomForest).with_param("n_estimators", json!("many"));
        assert!(matches!(spec.build(), Err(KolosalError::ConfigError(_))));
    }

    #[test]
    fn test_max_features_forms() {
        for value in [json!("sqrt"), json!("log2"), json!("all"), json!(2)] {
            let spec = CandidateSpec::new("rf", ModelKind::RandomForest).with_param("max_features", value);
            spec.build().unwrap();
        }
        let spec = CandidateSpec::new("rf", ModelKind::RandomForest).with_param("max_features", json!("half"));
        assert!(spec.build().is_err());
    }

    #[test]
    fn test_null_means_default() {
        let spec = CandidateSpec::new("rf", ModelKind::RandomForest).with_param("max_depth", Value::Null);
        let params = spec.build().unwrap().params();
        assert_eq!(params["max_depth"], Value::Null);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut registry = CandidateRegistry::empty();
        registry.register(CandidateSpec::new("a", ModelKind::DecisionTree)).unwrap();
        assert!(registry.register(CandidateSpec::new("a", ModelKind::RandomForest)).is_err());

        let listed: CandidateRegistry = vec![
            CandidateSpec::new("a", ModelKind::DecisionTree),
            CandidateSpec::new("a", ModelKind::DecisionTree),
        ]
        .into_iter()
        .collect();
        assert!(listed.validate().is_err());
    }

    #[test]
    fn test_registry_json_is_a_list() {
        let json = r#"[{"id": "lr", "kind": "logistic_regression", "params": {"max_iter": 50}}]"#;
        let registry: CandidateRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("lr").unwrap().kind, ModelKind::LogisticRegression);
    }
}
