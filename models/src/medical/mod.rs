pub mod patient;
pub mod prediction;
pub mod user;

pub use patient::{
    Gender, MaritalStatus, Patient, PatientDraft, PatientInput, ResidenceType, SmokingStatus,
    WorkType,
};
pub use prediction::{PredictionResult, RiskLevel};
pub use user::{Login, NewUser, Role, User, UserProfile};
