// lib/src/risk/mod.rs
// Turning a patient record into a stroke-risk prediction: feature encoding,
// scoring and categorization.

pub mod categorizer;
pub mod classifier;
pub mod features;
pub mod points;

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use models::medical::{Patient, PredictionResult};

use crate::config::{ModelConfig, RiskConfig, ScorerKind};

pub use categorizer::RiskCategorizer;
pub use classifier::{ModelArtifact, ModelClassifier};
pub use features::{FeatureValue, FeatureVector};
pub use points::ClinicalPointsScorer;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    #[error("Invalid score: {0}")]
    InvalidScore(f64),

    #[error("Invalid risk thresholds: {0}")]
    InvalidThresholds(String),
}

/// Maps a feature vector to a positive-class probability in [0, 1].
/// Implementations are deterministic and side-effect free.
pub trait RiskScorer: Send + Sync + Debug {
    fn score(&self, features: &FeatureVector) -> Result<f64, ClassifierError>;

    /// Probability at or above which the binary `prediction` flag is set.
    fn decision_threshold(&self) -> f64;

    fn name(&self) -> &'static str;
}

/// Builds the scorer selected by configuration. The model artifact is read
/// here, once; a missing or incompatible artifact fails startup.
pub fn load_scorer(config: &ModelConfig) -> Result<Arc<dyn RiskScorer>, ClassifierError> {
    let scorer: Arc<dyn RiskScorer> = match config.scorer {
        ScorerKind::Model => Arc::new(ModelClassifier::load(&config.artifact_path)?),
        ScorerKind::Points => Arc::new(ClinicalPointsScorer),
    };
    info!("Risk scorer ready: {}", scorer.name());
    Ok(scorer)
}

/// Scorer plus categorizer: everything needed to produce a `PredictionResult`.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    scorer: Arc<dyn RiskScorer>,
    categorizer: RiskCategorizer,
}

impl RiskEngine {
    pub fn new(scorer: Arc<dyn RiskScorer>, categorizer: RiskCategorizer) -> Self {
        RiskEngine { scorer, categorizer }
    }

    pub fn from_config(scorer: Arc<dyn RiskScorer>, risk: &RiskConfig) -> Result<Self, ClassifierError> {
        let categorizer = RiskCategorizer::new(risk.high_threshold, risk.medium_threshold)?;
        Ok(RiskEngine::new(scorer, categorizer))
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn categorizer(&self) -> &RiskCategorizer {
        &self.categorizer
    }

    /// Scores `patient` and labels the result, stamped with `now`.
    pub fn assess(&self, patient: &Patient, now: DateTime<Utc>) -> Result<PredictionResult, ClassifierError> {
        let features = FeatureVector::from_patient(patient);
        let score = self.scorer.score(&features)?;
        let risk_level = self.categorizer.categorize(score)?;
        Ok(PredictionResult {
            score,
            risk_level,
            prediction: score >= self.scorer.decision_threshold(),
            predicted_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::sample_inputs;
    use models::identifiers::PatientCode;
    use models::medical::RiskLevel;

    #[derive(Debug)]
    struct FixedScorer(f64);

    impl RiskScorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> Result<f64, ClassifierError> {
            Ok(self.0)
        }
        fn decision_threshold(&self) -> f64 {
            0.5
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn patient() -> Patient {
        let draft = sample_inputs()[0].validate().unwrap();
        Patient::new(draft, PatientCode::from_sequence(1), Utc::now())
    }

    #[test]
    fn assess_labels_and_flags() {
        let engine = RiskEngine::new(Arc::new(FixedScorer(0.82)), RiskCategorizer::default());
        let now = Utc::now();
        let result = engine.assess(&patient(), now).unwrap();
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.prediction);
        assert_eq!(result.predicted_at, now);
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let engine = RiskEngine::new(Arc::new(FixedScorer(1.2)), RiskCategorizer::default());
        assert_eq!(
            engine.assess(&patient(), Utc::now()).unwrap_err(),
            ClassifierError::InvalidScore(1.2)
        );
    }

    #[test]
    fn missing_artifact_fails_load() {
        let config = ModelConfig {
            scorer: ScorerKind::Model,
            artifact_path: "/nonexistent/stroke_model.json".into(),
        };
        assert!(matches!(load_scorer(&config), Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn points_scorer_needs_no_artifact() {
        let config = ModelConfig {
            scorer: ScorerKind::Points,
            artifact_path: "/nonexistent/stroke_model.json".into(),
        };
        assert_eq!(load_scorer(&config).unwrap().name(), "clinical-points");
    }
}
