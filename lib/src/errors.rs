// lib/src/errors.rs

use thiserror::Error;

use bincode::error::{DecodeError, EncodeError};
use models::errors::ValidationError;
use serde_json::Error as SerdeJsonError;
use uuid::Error as UuidError;

use crate::risk::ClassifierError;

#[derive(Debug, Error)]
pub enum StrokeError {
    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization/Deserialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Already Exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Risk(#[from] ClassifierError),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bincode decode error: {0}")]
    BincodeDecode(#[from] DecodeError),
    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] EncodeError),

    #[error("UUID error: {0}")]
    UuidError(#[from] UuidError),

    #[error("JSON serialization/deserialization error: {0}")]
    JsonError(#[from] SerdeJsonError),
}

impl StrokeError {
    pub fn patient_not_found(id: impl std::fmt::Display) -> Self {
        StrokeError::NotFound(format!("patient {}", id))
    }

    pub fn user_not_found(email: impl std::fmt::Display) -> Self {
        StrokeError::NotFound(format!("user {}", email))
    }

    /// Client-facing message for a `NotFound`, naming the kind of record
    /// without its key, e.g. "Patient not found".
    pub fn not_found_message(&self) -> Option<String> {
        let StrokeError::NotFound(what) = self else {
            return None;
        };
        let mut chars = what.split_whitespace().next().unwrap_or_default().chars();
        Some(match chars.next() {
            Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
            None => "Not found".to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, StrokeError>;

impl From<sled::Error> for StrokeError {
    fn from(err: sled::Error) -> Self {
        StrokeError::DatabaseError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StrokeError {
    fn from(err: tokio::task::JoinError) -> Self {
        StrokeError::InternalError(format!("Async task join error: {}", err))
    }
}

impl From<anyhow::Error> for StrokeError {
    fn from(err: anyhow::Error) -> Self {
        StrokeError::InternalError(format!("An internal error occurred: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_record_kind() {
        assert_eq!(
            StrokeError::patient_not_found("42").not_found_message().as_deref(),
            Some("Patient not found")
        );
        assert_eq!(
            StrokeError::user_not_found("a@hospital.com").not_found_message().as_deref(),
            Some("User not found")
        );
        assert_eq!(StrokeError::NotFound(String::new()).not_found_message().as_deref(), Some("Not found"));
        assert_eq!(StrokeError::AlreadyExists("x".into()).not_found_message(), None);
    }
}
