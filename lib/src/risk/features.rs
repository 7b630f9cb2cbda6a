// lib/src/risk/features.rs

use std::collections::BTreeMap;

use models::medical::Patient;

/// A single model input, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    /// Raw category label, encoded by the model's label encoders.
    Category(String),
}

impl FeatureValue {
    fn flag(value: bool) -> Self {
        FeatureValue::Number(if value { 1.0 } else { 0.0 })
    }
}

/// Named model inputs. Columns are keyed by their training-time names, so
/// `Residence_type` keeps its capital.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: FeatureValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: FeatureValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every attribute the patient has. Optional attributes the record lacks
    /// are left out; a model that needs them reports a mismatch.
    pub fn from_patient(patient: &Patient) -> Self {
        let mut features = FeatureVector::new()
            .with("gender", FeatureValue::Category(patient.gender.as_str().to_string()))
            .with("age", FeatureValue::Number(patient.age))
            .with("hypertension", FeatureValue::flag(patient.hypertension))
            .with("heart_disease", FeatureValue::flag(patient.heart_disease))
            .with("avg_glucose_level", FeatureValue::Number(patient.avg_glucose_level))
            .with("bmi", FeatureValue::Number(patient.bmi))
            .with(
                "smoking_status",
                FeatureValue::Category(patient.smoking_status.as_str().to_string()),
            );
        if let Some(married) = patient.ever_married {
            features.insert("ever_married", FeatureValue::Category(married.as_str().to_string()));
        }
        if let Some(work) = patient.work_type {
            features.insert("work_type", FeatureValue::Category(work.as_str().to_string()));
        }
        if let Some(residence) = patient.residence_type {
            features.insert("Residence_type", FeatureValue::Category(residence.as_str().to_string()));
        }
        features
    }
}
