// lib/src/risk/points.rs
// Rule-based clinical points score, usable without a model artifact.

use crate::risk::features::{FeatureValue, FeatureVector};
use crate::risk::{ClassifierError, RiskScorer};

const MAX_POINTS: f64 = 100.0;

/// Adds points per risk factor and reports `points / 100`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicalPointsScorer;

fn number(features: &FeatureVector, name: &str) -> Result<f64, ClassifierError> {
    match features.get(name) {
        Some(FeatureValue::Number(v)) if v.is_finite() => Ok(*v),
        Some(_) => Err(ClassifierError::FeatureMismatch(format!("feature {} expects a number", name))),
        None => Err(ClassifierError::FeatureMismatch(format!("missing feature {}", name))),
    }
}

fn category<'a>(features: &'a FeatureVector, name: &str) -> Result<&'a str, ClassifierError> {
    match features.get(name) {
        Some(FeatureValue::Category(label)) => Ok(label.as_str()),
        Some(_) => Err(ClassifierError::FeatureMismatch(format!("feature {} expects a category", name))),
        None => Err(ClassifierError::FeatureMismatch(format!("missing feature {}", name))),
    }
}

impl ClinicalPointsScorer {
    pub fn points(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        let mut points = 0.0;

        let age = number(features, "age")?;
        points += if age >= 70.0 {
            30.0
        } else if age >= 60.0 {
            20.0
        } else if age >= 50.0 {
            10.0
        } else {
            0.0
        };

        if number(features, "hypertension")? == 1.0 {
            points += 15.0;
        }
        if number(features, "heart_disease")? == 1.0 {
            points += 15.0;
        }

        let glucose = number(features, "avg_glucose_level")?;
        if glucose > 200.0 {
            points += 20.0;
        } else if glucose > 140.0 {
            points += 10.0;
        }

        let bmi = number(features, "bmi")?;
        if bmi >= 30.0 {
            points += 15.0;
        } else if bmi >= 25.0 {
            points += 5.0;
        }

        match category(features, "smoking_status")? {
            "smokes" => points += 20.0,
            "formerly smoked" => points += 10.0,
            _ => {}
        }

        if category(features, "gender")? == "Male" {
            points += 5.0;
        }

        Ok(f64::min(points, MAX_POINTS))
    }
}

impl RiskScorer for ClinicalPointsScorer {
    fn score(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        Ok(self.points(features)? / MAX_POINTS)
    }

    fn decision_threshold(&self) -> f64 {
        0.5
    }

    fn name(&self) -> &'static str {
        "clinical-points"
    }
}
