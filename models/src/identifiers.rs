// models/src/identifiers.rs

use core::ops::Deref;
use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

const PREFIX: &str = "PT";
const MIN_DIGITS: usize = 5;

/// Human-readable patient code, `PT` followed by a zero-padded sequence
/// number (`PT00042`). Codes are assigned from a monotonic counter and are
/// never reused after a delete.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientCode(String);

impl PatientCode {
    /// Builds the code for the given sequence number.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{}{:0width$}", PREFIX, sequence, width = MIN_DIGITS))
    }

    /// Parses and validates a code.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidPatientCode` if `value` is not `PT`
    /// followed by at least five digits.
    pub fn new(value: String) -> ValidationResult<Self> {
        let digits = value.strip_prefix(PREFIX).unwrap_or("");
        if digits.len() < MIN_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPatientCode(value));
        }
        Ok(Self(value))
    }

    /// The numeric part of the code.
    pub fn sequence(&self) -> u64 {
        self.0[PREFIX.len()..].parse().unwrap_or(0)
    }
}

impl AsRef<str> for PatientCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for PatientCode {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for PatientCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for PatientCode {
    type Error = ValidationError;

    fn try_from(value: String) -> ValidationResult<Self> {
        Self::new(value)
    }
}

impl fmt::Display for PatientCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PatientCode> for String {
    fn from(value: PatientCode) -> Self {
        value.0
    }
}

impl PartialOrd for PatientCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PatientCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence().cmp(&other.sequence())
    }
}

#[cfg(test)]
mod tests {
    use super::PatientCode;
    use crate::errors::ValidationError;
    use core::str::FromStr;

    #[test]
    fn should_pad_sequence_to_five_digits() {
        assert_eq!(PatientCode::from_sequence(7).as_ref(), "PT00007");
        assert_eq!(PatientCode::from_sequence(123456).as_ref(), "PT123456");
    }

    #[test]
    fn should_not_create_code_without_prefix() {
        let code = PatientCode::new("00001".to_string());
        assert_eq!(code.unwrap_err(), ValidationError::InvalidPatientCode("00001".to_string()));
    }

    #[test]
    fn should_not_create_code_with_short_or_alpha_suffix() {
        assert!(PatientCode::from_str("PT12").is_err());
        assert!(PatientCode::from_str("PT0001A").is_err());
    }

    #[test]
    fn should_order_by_sequence() {
        let a = PatientCode::from_str("PT00009").unwrap();
        let b = PatientCode::from_str("PT100000").unwrap();
        assert!(a < b);
        assert_eq!(b.sequence(), 100000);
    }
}
