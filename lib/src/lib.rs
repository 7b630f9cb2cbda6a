// lib/src/lib.rs
// Core of the stroke-risk service: configuration, storage, scoring and
// aggregation. HTTP and authentication live in their own crates.

pub mod config;
pub mod context;
pub mod dashboard;
pub mod errors;
pub mod patient_service;
pub mod risk;
pub mod samples;
pub mod storage_engine;

pub use models::medical::{Patient, PatientInput, PredictionResult, RiskLevel, User};

pub use crate::config::AppConfig;
pub use crate::context::ServiceContext;
pub use crate::dashboard::DashboardAggregator;
pub use crate::errors::*;
pub use crate::patient_service::{BulkCreateReport, PatientService, RescoreReport};
pub use crate::risk::{ClassifierError, RiskCategorizer, RiskEngine, RiskScorer};
pub use crate::storage_engine::{
    create_storage, PatientPage, PatientQuery, PatientStorageEngine, Storage, UserStorageEngine,
};
