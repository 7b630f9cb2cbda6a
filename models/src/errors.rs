// models/src/errors.rs

use std::fmt;

use serde::{Deserialize, Serialize};
pub use thiserror::Error;

/// A single field-level validation failure, reported back to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A validation error.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// One or more input fields were missing or out of range.
    #[error("invalid input: {}", join_fields(.0))]
    Fields(Vec<FieldError>),
    /// A patient code did not match the `PT00001` format.
    #[error("patient code '{0}' is invalid")]
    InvalidPatientCode(String),
}

impl ValidationError {
    /// Wraps a single field failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Fields(vec![FieldError::new(field, message)])
    }

    /// The field-level details, suitable for a 400 response body.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            ValidationError::Fields(errors) => errors.clone(),
            ValidationError::InvalidPatientCode(code) => {
                vec![FieldError::new("patient_code", format!("'{}' is not a valid patient code", code))]
            }
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
