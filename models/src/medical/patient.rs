// models/src/medical/patient.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::{FieldError, ValidationError, ValidationResult};
use crate::identifiers::PatientCode;
use crate::medical::prediction::{PredictionResult, RiskLevel};
use crate::validation;

/// Declares a categorical attribute whose wire spelling is the category name
/// the risk model was trained on.
macro_rules! categorical {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Accepted spellings, for validation messages.
            pub fn labels() -> Vec<&'static str> {
                vec![$($label),+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == trimmed)
                    .or_else(|| Self::ALL.iter().copied().find(|v| v.as_str().eq_ignore_ascii_case(trimmed)))
                    .ok_or_else(|| format!("must be one of: {}", Self::labels().join(", ")))
            }
        }
    };
}

categorical! {
    pub enum Gender {
        Female => "Female",
        Male => "Male",
        Other => "Other",
    }
}

categorical! {
    pub enum SmokingStatus {
        Unknown => "Unknown",
        FormerlySmoked => "formerly smoked",
        NeverSmoked => "never smoked",
        Smokes => "smokes",
    }
}

categorical! {
    /// Encoded as the `ever_married` feature.
    pub enum MaritalStatus {
        No => "No",
        Yes => "Yes",
    }
}

categorical! {
    pub enum WorkType {
        GovtJob => "Govt_job",
        NeverWorked => "Never_worked",
        Private => "Private",
        SelfEmployed => "Self-employed",
        Children => "children",
    }
}

categorical! {
    pub enum ResidenceType {
        Rural => "Rural",
        Urban => "Urban",
    }
}

/// Stored patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub patient_code: PatientCode,
    pub name: Option<String>,
    pub age: f64,
    pub gender: Gender,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub ever_married: Option<MaritalStatus>,
    pub work_type: Option<WorkType>,
    #[serde(rename = "Residence_type")]
    pub residence_type: Option<ResidenceType>,
    pub avg_glucose_level: f64,
    pub bmi: f64,
    pub smoking_status: SmokingStatus,
    /// Recorded stroke outcome, not a prediction.
    pub stroke: bool,
    pub notes: Option<String>,
    pub prediction: Option<PredictionResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Creates a new unscored record from validated input.
    pub fn new(draft: PatientDraft, patient_code: PatientCode, now: DateTime<Utc>) -> Self {
        Patient {
            id: Uuid::new_v4(),
            patient_code,
            name: draft.name,
            age: draft.age,
            gender: draft.gender,
            hypertension: draft.hypertension,
            heart_disease: draft.heart_disease,
            ever_married: draft.ever_married,
            work_type: draft.work_type,
            residence_type: draft.residence_type,
            avg_glucose_level: draft.avg_glucose_level,
            bmi: draft.bmi,
            smoking_status: draft.smoking_status,
            stroke: draft.stroke,
            notes: draft.notes,
            prediction: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the editable attributes. Identity, code, creation time and
    /// the prediction slot are left alone.
    pub fn apply(&mut self, draft: PatientDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.age = draft.age;
        self.gender = draft.gender;
        self.hypertension = draft.hypertension;
        self.heart_disease = draft.heart_disease;
        self.ever_married = draft.ever_married;
        self.work_type = draft.work_type;
        self.residence_type = draft.residence_type;
        self.avg_glucose_level = draft.avg_glucose_level;
        self.bmi = draft.bmi;
        self.smoking_status = draft.smoking_status;
        self.stroke = draft.stroke;
        self.notes = draft.notes;
        self.updated_at = now;
    }

    /// Replaces the single prediction slot.
    pub fn set_prediction(&mut self, prediction: PredictionResult) {
        self.updated_at = prediction.predicted_at;
        self.prediction = Some(prediction);
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.prediction.as_ref().map(|p| p.risk_level)
    }

    pub fn risk_score(&self) -> Option<f64> {
        self.prediction.as_ref().map(|p| p.score)
    }

    pub fn predicted_at(&self) -> Option<DateTime<Utc>> {
        self.prediction.as_ref().map(|p| p.predicted_at)
    }

    /// Case-insensitive substring match over code, name and gender.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.patient_code.to_lowercase().contains(needle)
            || self
                .name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(needle))
            || self.gender.as_str().to_lowercase().contains(needle)
    }

    /// The record's attributes as a fully populated input, used as the base
    /// when merging a partial update.
    pub fn to_input(&self) -> PatientInput {
        PatientInput {
            name: self.name.clone(),
            age: Some(self.age),
            gender: Some(self.gender.as_str().to_string()),
            hypertension: Some(self.hypertension),
            heart_disease: Some(self.heart_disease),
            ever_married: self.ever_married.map(|v| v.as_str().to_string()),
            work_type: self.work_type.map(|v| v.as_str().to_string()),
            residence_type: self.residence_type.map(|v| v.as_str().to_string()),
            avg_glucose_level: Some(self.avg_glucose_level),
            bmi: Some(self.bmi),
            smoking_status: Some(self.smoking_status.as_str().to_string()),
            stroke: Some(self.stroke),
            notes: self.notes.clone(),
        }
    }
}

/// Validated patient attributes, ready to become or update a `Patient`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientDraft {
    pub name: Option<String>,
    pub age: f64,
    pub gender: Gender,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub ever_married: Option<MaritalStatus>,
    pub work_type: Option<WorkType>,
    pub residence_type: Option<ResidenceType>,
    pub avg_glucose_level: f64,
    pub bmi: f64,
    pub smoking_status: SmokingStatus,
    pub stroke: bool,
    pub notes: Option<String>,
}

/// Patient payload as received over HTTP, for both create and update.
/// Everything is optional here so that missing and malformed fields can be
/// reported together, per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub hypertension: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub heart_disease: Option<bool>,
    #[serde(default)]
    pub ever_married: Option<String>,
    #[serde(default)]
    pub work_type: Option<String>,
    #[serde(default, rename = "Residence_type", alias = "residence_type")]
    pub residence_type: Option<String>,
    #[serde(default)]
    pub avg_glucose_level: Option<f64>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub smoking_status: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub stroke: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// JSON keys of `PatientInput`, in the order type errors are reported.
const INPUT_KEYS: &[&str] = &[
    "name",
    "age",
    "gender",
    "hypertension",
    "heart_disease",
    "ever_married",
    "work_type",
    "Residence_type",
    "residence_type",
    "avg_glucose_level",
    "bmi",
    "smoking_status",
    "stroke",
    "notes",
];

impl PatientInput {
    /// Decodes a JSON body. Every field holding a value of the wrong type is
    /// reported, instead of stopping at the first.
    pub fn from_json(body: serde_json::Value) -> ValidationResult<PatientInput> {
        let Some(object) = body.as_object() else {
            return Err(ValidationError::field("body", "expected a JSON object"));
        };
        let errors: Vec<FieldError> = INPUT_KEYS
            .iter()
            .filter_map(|key| {
                let value = object.get(*key)?;
                let mut single = serde_json::Map::new();
                single.insert(key.to_string(), value.clone());
                serde_json::from_value::<PatientInput>(serde_json::Value::Object(single))
                    .err()
                    .map(|e| FieldError::new(*key, e.to_string()))
            })
            .collect();
        if !errors.is_empty() {
            return Err(ValidationError::Fields(errors));
        }
        serde_json::from_value(body).map_err(|e| ValidationError::field("body", e.to_string()))
    }

    /// Sanitizes free text and validates every field.
    pub fn validate(&self) -> ValidationResult<PatientDraft> {
        validation::validate_patient(self)
    }

    /// Fills every field this update leaves out from `existing`.
    pub fn merged_over(self, existing: &Patient) -> PatientInput {
        let base = existing.to_input();
        PatientInput {
            name: self.name.or(base.name),
            age: self.age.or(base.age),
            gender: self.gender.or(base.gender),
            hypertension: self.hypertension.or(base.hypertension),
            heart_disease: self.heart_disease.or(base.heart_disease),
            ever_married: self.ever_married.or(base.ever_married),
            work_type: self.work_type.or(base.work_type),
            residence_type: self.residence_type.or(base.residence_type),
            avg_glucose_level: self.avg_glucose_level.or(base.avg_glucose_level),
            bmi: self.bmi.or(base.bmi),
            smoking_status: self.smoking_status.or(base.smoking_status),
            stroke: self.stroke.or(base.stroke),
            notes: self.notes.or(base.notes),
        }
    }

    /// Whether this payload touches any attribute the risk model reads.
    pub fn touches_risk_factors(&self) -> bool {
        self.age.is_some()
            || self.gender.is_some()
            || self.hypertension.is_some()
            || self.heart_disease.is_some()
            || self.ever_married.is_some()
            || self.work_type.is_some()
            || self.residence_type.is_some()
            || self.avg_glucose_level.is_some()
            || self.bmi.is_some()
            || self.smoking_status.is_some()
    }
}

/// Accepts `true`/`false` as well as the `0`/`1` flags the dataset uses.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
    }

    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawFlag::Bool(b)) => Ok(Some(b)),
        Some(RawFlag::Int(0)) => Ok(Some(false)),
        Some(RawFlag::Int(1)) => Ok(Some(true)),
        Some(RawFlag::Int(other)) => Err(serde::de::Error::custom(format!(
            "expected a boolean or 0/1 flag, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> PatientInput {
        serde_json::from_value(serde_json::json!({
            "name": "John Smith",
            "age": 65,
            "gender": "Male",
            "hypertension": 1,
            "heart_disease": false,
            "ever_married": "Yes",
            "work_type": "Private",
            "Residence_type": "Urban",
            "avg_glucose_level": 185.5,
            "bmi": 28.3,
            "smoking_status": "formerly smoked"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_numeric_and_boolean_flags() {
        let input = sample_input();
        assert_eq!(input.hypertension, Some(true));
        assert_eq!(input.heart_disease, Some(false));
        assert_eq!(input.stroke, None);
    }

    #[test]
    fn from_json_reports_each_mistyped_field() {
        let err = PatientInput::from_json(serde_json::json!({
            "name": "X",
            "age": "abc",
            "gender": "Male",
            "hypertension": 2,
            "bmi": 24.0
        }))
        .unwrap_err();
        let fields: Vec<String> = err.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["age".to_string(), "hypertension".to_string()]);
    }

    #[test]
    fn from_json_accepts_well_typed_body_and_rejects_non_objects() {
        let input = PatientInput::from_json(serde_json::json!({ "age": 40, "residence_type": "Rural" })).unwrap();
        assert_eq!(input.age, Some(40.0));
        assert_eq!(input.residence_type.as_deref(), Some("Rural"));

        let err = PatientInput::from_json(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "body");
    }

    #[test]
    fn rejects_flag_outside_zero_one() {
        let parsed: Result<PatientInput, _> =
            serde_json::from_value(serde_json::json!({ "hypertension": 2 }));
        assert!(parsed.is_err());
    }

    #[test]
    fn categorical_values_use_training_spelling() {
        assert_eq!("formerly smoked".parse::<SmokingStatus>().unwrap(), SmokingStatus::FormerlySmoked);
        assert_eq!("self-employed".parse::<WorkType>().unwrap(), WorkType::SelfEmployed);
        assert_eq!(serde_json::to_string(&WorkType::Children).unwrap(), "\"children\"");
        assert!("Maybe".parse::<MaritalStatus>().is_err());
    }

    #[test]
    fn merged_update_keeps_untouched_fields() {
        let draft = sample_input().validate().unwrap();
        let patient = Patient::new(draft, PatientCode::from_sequence(1), Utc::now());

        let update = PatientInput {
            bmi: Some(31.0),
            ..PatientInput::default()
        };
        assert!(update.touches_risk_factors());
        let merged = update.merged_over(&patient).validate().unwrap();
        assert_eq!(merged.bmi, 31.0);
        assert_eq!(merged.age, 65.0);
        assert_eq!(merged.name.as_deref(), Some("John Smith"));
        assert_eq!(merged.residence_type, Some(ResidenceType::Urban));
    }

    #[test]
    fn notes_only_update_does_not_touch_risk_factors() {
        let update = PatientInput {
            notes: Some("follow up in 3 months".into()),
            ..PatientInput::default()
        };
        assert!(!update.touches_risk_factors());
    }

    #[test]
    fn search_matches_code_name_and_gender() {
        let draft = sample_input().validate().unwrap();
        let patient = Patient::new(draft, PatientCode::from_sequence(42), Utc::now());
        assert!(patient.matches_search("pt00042"));
        assert!(patient.matches_search("smith"));
        assert!(patient.matches_search("male"));
        assert!(!patient.matches_search("chen"));
    }
}
