// models/src/lib.rs
// Shared domain types for the stroke risk service: patients, predictions,
// users and dashboard snapshots.

pub mod dashboard;
pub mod errors;
pub mod identifiers;
pub mod medical;
pub mod validation;

pub use dashboard::{
    AgeBucket, Analytics, BmiCategory, DashboardSnapshot, DashboardStats, MonthlyCount,
    RecentPatient, RiskDistribution, RiskFactorCounts,
};
pub use errors::{FieldError, ValidationError, ValidationResult};
pub use identifiers::PatientCode;
pub use medical::{
    Gender, Login, MaritalStatus, NewUser, Patient, PatientDraft, PatientInput, PredictionResult,
    ResidenceType, RiskLevel, Role, SmokingStatus, User, UserProfile, WorkType,
};
