// lib/src/context.rs

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dashboard::DashboardAggregator;
use crate::errors::Result;
use crate::patient_service::PatientService;
use crate::risk::{load_scorer, RiskEngine, RiskScorer};
use crate::storage_engine::{create_storage, Storage};

/// Everything a request handler or CLI command needs, opened once per
/// process.
#[derive(Clone)]
pub struct ServiceContext {
    pub storage: Storage,
    pub patients: PatientService,
    pub dashboard: DashboardAggregator,
}

impl ServiceContext {
    /// Opens storage and loads the configured scorer. Fails if the model
    /// artifact cannot be loaded.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let scorer = load_scorer(&config.model)?;
        let storage = create_storage(&config.storage)?;
        Self::with_parts(config, storage, scorer)
    }

    /// Assembles a context from already opened parts.
    pub fn with_parts(config: &AppConfig, storage: Storage, scorer: Arc<dyn RiskScorer>) -> Result<Self> {
        let risk = RiskEngine::from_config(scorer, &config.risk)?;
        let patients = PatientService::from_config(storage.patients.clone(), risk, config);
        let dashboard = DashboardAggregator::new(storage.patients.clone(), &config.dashboard)?;
        Ok(ServiceContext {
            storage,
            patients,
            dashboard,
        })
    }
}
