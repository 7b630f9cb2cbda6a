// lib/src/risk/classifier.rs
// Scores patients with a pre-trained classifier exported as JSON. The bundle
// carries its own preprocessing (label encoders and a standard scaler) so the
// encoding always matches training.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::risk::features::{FeatureValue, FeatureVector};
use crate::risk::{ClassifierError, RiskScorer};

const LEAF: i64 = -1;

/// Standardization applied to `numerical_cols`, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// One fitted decision tree in flat array form. Node `i` is a leaf when
/// `children_left[i] == -1`; `value[i]` is then its positive-class
/// probability. Samples go left when `x[feature[i]] <= threshold[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl DecisionTree {
    fn validate(&self, index: usize, n_features: usize) -> Result<(), ClassifierError> {
        let nodes = self.children_left.len();
        let fail = |msg: String| ClassifierError::ModelLoad(format!("tree {}: {}", index, msg));
        if nodes == 0 {
            return Err(fail("no nodes".to_string()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != nodes)
        {
            return Err(fail("node arrays differ in length".to_string()));
        }
        for node in 0..nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                let v = self.value[node];
                if !(0.0..=1.0).contains(&v) {
                    return Err(fail(format!("leaf {} value {} outside [0, 1]", node, v)));
                }
                continue;
            }
            // Children always come after their parent, which also rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child as usize >= nodes {
                    return Err(fail(format!("node {} has invalid child {}", node, child)));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(fail(format!("node {} splits on unknown feature {}", node, feature)));
            }
            if !self.threshold[node].is_finite() {
                return Err(fail(format!("node {} has a non-finite threshold", node)));
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            node = if x[self.feature[node] as usize] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.value[node]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression { coefficients: Vec<f64>, intercept: f64 },
    /// Forest probability is the mean of the trees' leaf probabilities.
    RandomForest { trees: Vec<DecisionTree> },
}

impl Estimator {
    fn name(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression { .. } => "logistic-regression",
            Estimator::RandomForest { .. } => "random-forest",
        }
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        match self {
            Estimator::LogisticRegression { coefficients, intercept } => {
                let z = intercept + coefficients.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
                1.0 / (1.0 + (-z).exp())
            }
            Estimator::RandomForest { trees } => {
                trees.iter().map(|t| t.predict(x)).sum::<f64>() / trees.len() as f64
            }
        }
    }
}

/// The serialized classifier bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub version: Option<String>,
    /// Column order the estimator expects.
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub numerical_cols: Vec<String>,
    pub scaler: StandardScaler,
    /// Column name to the encoder's classes; a label's index is its code.
    #[serde(default)]
    pub label_encoders: HashMap<String, Vec<String>>,
    pub optimal_threshold: f64,
    pub estimator: Estimator,
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| ClassifierError::ModelLoad(format!("malformed artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Checks that every part of the bundle agrees on the feature layout.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let load = |msg: String| Err(ClassifierError::ModelLoad(msg));
        let n = self.feature_columns.len();
        if n == 0 {
            return load("artifact lists no feature columns".to_string());
        }
        let columns: HashSet<&str> = self.feature_columns.iter().map(String::as_str).collect();
        if columns.len() != n {
            return load("duplicate feature columns".to_string());
        }
        for col in &self.numerical_cols {
            if !columns.contains(col.as_str()) {
                return load(format!("numerical column {} is not a feature column", col));
            }
            if self.label_encoders.contains_key(col) {
                return load(format!("column {} is both numerical and categorical", col));
            }
        }
        if self.scaler.mean.len() != self.numerical_cols.len()
            || self.scaler.scale.len() != self.numerical_cols.len()
        {
            return load(format!(
                "scaler has {} means and {} scales for {} numerical columns",
                self.scaler.mean.len(),
                self.scaler.scale.len(),
                self.numerical_cols.len()
            ));
        }
        if self.scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite())
            || self.scaler.mean.iter().any(|m| !m.is_finite())
        {
            return load("scaler contains zero or non-finite values".to_string());
        }
        for (col, classes) in &self.label_encoders {
            if !columns.contains(col.as_str()) {
                return load(format!("label encoder for unknown column {}", col));
            }
            if classes.is_empty() {
                return load(format!("label encoder for {} has no classes", col));
            }
        }
        if !(0.0..=1.0).contains(&self.optimal_threshold) {
            return load(format!("optimal_threshold {} outside [0, 1]", self.optimal_threshold));
        }
        match &self.estimator {
            Estimator::LogisticRegression { coefficients, intercept } => {
                if coefficients.len() != n {
                    return load(format!(
                        "{} coefficients for {} feature columns",
                        coefficients.len(),
                        n
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return load("non-finite coefficients".to_string());
                }
            }
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    return load("random forest has no trees".to_string());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(i, n)?;
                }
            }
        }
        Ok(())
    }
}

/// Model-backed `RiskScorer`.
#[derive(Debug, Clone)]
pub struct ModelClassifier {
    artifact: ModelArtifact,
    /// Position of each numerical column in the scaler arrays.
    scaler_index: HashMap<String, usize>,
}

impl ModelClassifier {
    /// Reads and checks the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::ModelLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let classifier = Self::from_artifact(ModelArtifact::from_json(&json)?)?;
        info!(
            "Loaded {} model from {:?} ({} features, version {})",
            classifier.artifact.estimator.name(),
            path,
            classifier.artifact.feature_columns.len(),
            classifier.artifact.version.as_deref().unwrap_or("unversioned")
        );
        Ok(classifier)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ClassifierError> {
        artifact.validate()?;
        let scaler_index = artifact
            .numerical_cols
            .iter()
            .enumerate()
            .map(|(i, col)| (col.clone(), i))
            .collect();
        Ok(ModelClassifier { artifact, scaler_index })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Encodes `features` into the estimator's input row.
    pub fn encode(&self, features: &FeatureVector) -> Result<Vec<f64>, ClassifierError> {
        self.artifact
            .feature_columns
            .iter()
            .map(|col| {
                let value = features
                    .get(col)
                    .ok_or_else(|| ClassifierError::FeatureMismatch(format!("missing feature {}", col)))?;
                match (self.artifact.label_encoders.get(col), value) {
                    (Some(classes), FeatureValue::Category(label)) => classes
                        .iter()
                        .position(|c| c == label)
                        .map(|code| code as f64)
                        .ok_or_else(|| {
                            ClassifierError::FeatureMismatch(format!(
                                "unknown category '{}' for feature {}",
                                label, col
                            ))
                        }),
                    (Some(_), FeatureValue::Number(_)) => Err(ClassifierError::FeatureMismatch(
                        format!("feature {} expects a category, got a number", col),
                    )),
                    (None, FeatureValue::Category(_)) => Err(ClassifierError::FeatureMismatch(
                        format!("feature {} expects a number, got a category", col),
                    )),
                    (None, FeatureValue::Number(x)) if !x.is_finite() => Err(
                        ClassifierError::FeatureMismatch(format!("feature {} is not finite", col)),
                    ),
                    (None, FeatureValue::Number(x)) => Ok(match self.scaler_index.get(col) {
                        Some(&i) => (x - self.artifact.scaler.mean[i]) / self.artifact.scaler.scale[i],
                        None => *x,
                    }),
                }
            })
            .collect()
    }
}

impl RiskScorer for ModelClassifier {
    fn score(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        let row = self.encode(features)?;
        let p = self.artifact.estimator.predict_proba(&row);
        debug!("Model score {:.4} for row {:?}", p, row);
        if p.is_nan() || !(0.0..=1.0).contains(&p) {
            return Err(ClassifierError::InvalidScore(p));
        }
        Ok(p)
    }

    fn decision_threshold(&self) -> f64 {
        self.artifact.optimal_threshold
    }

    fn name(&self) -> &'static str {
        self.artifact.estimator.name()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    fn logistic_json() -> serde_json::Value {
        json!({
            "version": "test",
            "feature_columns": ["gender", "age", "hypertension"],
            "numerical_cols": ["age"],
            "scaler": { "mean": [50.0], "scale": [10.0] },
            "label_encoders": { "gender": ["Female", "Male", "Other"] },
            "optimal_threshold": 0.5,
            "estimator": { "type": "logistic_regression", "coefficients": [0.0, 1.0, 2.0], "intercept": -1.0 }
        })
    }

    fn classifier(value: serde_json::Value) -> Result<ModelClassifier, ClassifierError> {
        ModelClassifier::from_artifact(ModelArtifact::from_json(&value.to_string())?)
    }

    fn features(gender: &str, age: f64, hypertension: f64) -> FeatureVector {
        FeatureVector::new()
            .with("gender", FeatureValue::Category(gender.to_string()))
            .with("age", FeatureValue::Number(age))
            .with("hypertension", FeatureValue::Number(hypertension))
    }

    #[test]
    fn logistic_regression_scales_then_applies_sigmoid() {
        let model = classifier(logistic_json()).unwrap();
        // z = -1 + 1.0 * (60 - 50) / 10 + 2.0 * 1 = 2
        let p = model.score(&features("Male", 60.0, 1.0)).unwrap();
        assert!((p - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
        // z = -1 + 0 + 0 = -1
        let p = model.score(&features("Female", 50.0, 0.0)).unwrap();
        assert!((p - 1.0 / (1.0 + 1.0f64.exp())).abs() < 1e-12);
    }

    #[test]
    fn scoring_is_deterministic() {
        let model = classifier(logistic_json()).unwrap();
        let f = features("Other", 71.0, 1.0);
        assert_eq!(model.score(&f).unwrap(), model.score(&f).unwrap());
    }

    #[test]
    fn missing_or_mistyped_features_are_rejected() {
        let model = classifier(logistic_json()).unwrap();
        let missing = FeatureVector::new().with("age", FeatureValue::Number(40.0));
        assert!(matches!(model.score(&missing), Err(ClassifierError::FeatureMismatch(_))));

        let unknown = features("Unspecified", 40.0, 0.0);
        assert!(matches!(model.score(&unknown), Err(ClassifierError::FeatureMismatch(_))));

        let numeric_gender = features("Male", 40.0, 0.0).with("gender", FeatureValue::Number(1.0));
        assert!(matches!(model.score(&numeric_gender), Err(ClassifierError::FeatureMismatch(_))));

        let text_age = features("Male", 40.0, 0.0).with("age", FeatureValue::Category("forty".into()));
        assert!(matches!(model.score(&text_age), Err(ClassifierError::FeatureMismatch(_))));
    }

    #[test]
    fn random_forest_averages_leaf_probabilities() {
        let mut value = logistic_json();
        // Tree 1 splits on scaled age at 0 (age 50); tree 2 is a single leaf.
        value["estimator"] = json!({
            "type": "random_forest",
            "trees": [
                {
                    "children_left": [1, -1, -1],
                    "children_right": [2, -1, -1],
                    "feature": [1, -2, -2],
                    "threshold": [0.0, -2.0, -2.0],
                    "value": [0.5, 0.1, 0.9]
                },
                {
                    "children_left": [-1],
                    "children_right": [-1],
                    "feature": [-2],
                    "threshold": [-2.0],
                    "value": [0.3]
                }
            ]
        });
        let model = classifier(value).unwrap();
        assert_eq!(model.name(), "random-forest");
        assert!((model.score(&features("Male", 80.0, 0.0)).unwrap() - 0.6).abs() < 1e-12);
        assert!((model.score(&features("Male", 30.0, 0.0)).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn incompatible_artifacts_fail_to_load() {
        let mut short = logistic_json();
        short["estimator"]["coefficients"] = json!([1.0, 2.0]);
        assert!(matches!(classifier(short), Err(ClassifierError::ModelLoad(_))));

        let mut scaler = logistic_json();
        scaler["scaler"] = json!({ "mean": [50.0, 1.0], "scale": [10.0] });
        assert!(matches!(classifier(scaler), Err(ClassifierError::ModelLoad(_))));

        let mut cyclic = logistic_json();
        cyclic["estimator"] = json!({
            "type": "random_forest",
            "trees": [{
                "children_left": [0],
                "children_right": [0],
                "feature": [1],
                "threshold": [0.0],
                "value": [0.5]
            }]
        });
        assert!(matches!(classifier(cyclic), Err(ClassifierError::ModelLoad(_))));

        assert!(matches!(
            ModelArtifact::from_json("{ not json"),
            Err(ClassifierError::ModelLoad(_))
        ));
    }

    #[test]
    fn bundled_artifact_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../assets/stroke_risk_model.json");
        let model = ModelClassifier::load(&path).unwrap();
        assert_eq!(model.artifact().feature_columns.len(), 7);
        assert!(model.decision_threshold() > 0.0);
    }
}
