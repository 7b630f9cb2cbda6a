// models/src/validation.rs
// Input hygiene and range checks shared by the API and the CLI.

use std::ops::RangeInclusive;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{FieldError, ValidationError, ValidationResult};
use crate::medical::patient::{
    Gender, MaritalStatus, PatientDraft, PatientInput, ResidenceType, SmokingStatus, WorkType,
};

pub const MAX_TEXT_LENGTH: usize = 500;
pub const AGE_RANGE: RangeInclusive<f64> = 0.0..=120.0;
pub const BMI_RANGE: RangeInclusive<f64> = 10.0..=80.0;
pub const GLUCOSE_RANGE: RangeInclusive<f64> = 50.0..=500.0;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

static UNSAFE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>&"']"#).expect("sanitize pattern is valid"));

/// Strips markup-significant characters and caps the length.
pub fn sanitize_input(value: &str) -> String {
    let cleaned = UNSAFE_CHARS_RE.replace_all(value, "");
    cleaned.chars().take(MAX_TEXT_LENGTH).collect()
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Lowercases and trims an email, then checks its format.
pub fn normalize_email(email: &str) -> ValidationResult<String> {
    let normalized = email.trim().to_lowercase();
    if validate_email(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::field("email", "invalid email format"))
    }
}

fn sanitize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(sanitize_input)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required_number(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<f64>,
    range: RangeInclusive<f64>,
) -> f64 {
    match value {
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            0.0
        }
        Some(v) if !v.is_finite() || !range.contains(&v) => {
            errors.push(FieldError::new(
                field,
                format!("must be between {} and {}", range.start(), range.end()),
            ));
            v
        }
        Some(v) => v,
    }
}

fn required_category<T: FromStr<Err = String> + Copy>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    fallback: T,
) -> T {
    match value {
        None => {
            errors.push(FieldError::new(field, format!("{} is required", field)));
            fallback
        }
        Some(raw) => raw.parse::<T>().unwrap_or_else(|message| {
            errors.push(FieldError::new(field, message));
            fallback
        }),
    }
}

fn optional_category<T: FromStr<Err = String>>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
) -> Option<T> {
    let raw = value?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(message) => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

/// Validates a patient payload. Required: `gender`, `age`,
/// `avg_glucose_level`, `bmi`, `smoking_status`. Every failure is collected
/// before returning.
pub fn validate_patient(input: &PatientInput) -> ValidationResult<PatientDraft> {
    let mut errors = Vec::new();

    let age = required_number(&mut errors, "age", input.age, AGE_RANGE);
    let bmi = required_number(&mut errors, "bmi", input.bmi, BMI_RANGE);
    let avg_glucose_level = required_number(
        &mut errors,
        "avg_glucose_level",
        input.avg_glucose_level,
        GLUCOSE_RANGE,
    );
    let gender = required_category(&mut errors, "gender", input.gender.as_deref(), Gender::Other);
    let smoking_status = required_category(
        &mut errors,
        "smoking_status",
        input.smoking_status.as_deref(),
        SmokingStatus::Unknown,
    );
    let ever_married: Option<MaritalStatus> =
        optional_category(&mut errors, "ever_married", input.ever_married.as_deref());
    let work_type: Option<WorkType> =
        optional_category(&mut errors, "work_type", input.work_type.as_deref());
    let residence_type: Option<ResidenceType> =
        optional_category(&mut errors, "Residence_type", input.residence_type.as_deref());

    if !errors.is_empty() {
        return Err(ValidationError::Fields(errors));
    }

    Ok(PatientDraft {
        name: sanitize_optional(&input.name),
        age,
        gender,
        hypertension: input.hypertension.unwrap_or(false),
        heart_disease: input.heart_disease.unwrap_or(false),
        ever_married,
        work_type,
        residence_type,
        avg_glucose_level,
        bmi,
        smoking_status,
        stroke: input.stroke.unwrap_or(false),
        notes: sanitize_optional(&input.notes),
    })
}
