// lib/src/patient_service.rs
// Validate, score, persist. Everything that writes a patient goes through here.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::errors::ValidationResult;
use models::medical::{Patient, PatientInput};

use crate::config::{AppConfig, PaginationConfig};
use crate::errors::{Result, StrokeError};
use crate::risk::RiskEngine;
use crate::samples::sample_inputs;
use crate::storage_engine::{PatientPage, PatientQuery, PatientStorageEngine};

/// Outcome of a bulk import. Failed items are reported by their zero-based
/// position in the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkCreateReport {
    pub created_count: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescoreReport {
    pub scored: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn PatientStorageEngine>,
    risk: RiskEngine,
    score_on_create: bool,
    pagination: PaginationConfig,
}

impl PatientService {
    pub fn new(
        store: Arc<dyn PatientStorageEngine>,
        risk: RiskEngine,
        score_on_create: bool,
        pagination: PaginationConfig,
    ) -> Self {
        PatientService {
            store,
            risk,
            score_on_create,
            pagination,
        }
    }

    pub fn from_config(store: Arc<dyn PatientStorageEngine>, risk: RiskEngine, config: &AppConfig) -> Self {
        Self::new(store, risk, config.risk.score_on_create, config.pagination.clone())
    }

    pub fn store(&self) -> &Arc<dyn PatientStorageEngine> {
        &self.store
    }

    pub fn risk(&self) -> &RiskEngine {
        &self.risk
    }

    /// Registers a new patient. When scoring on create is enabled the record
    /// is scored before it is stored, so a scoring failure persists nothing.
    pub async fn create(&self, input: PatientInput) -> Result<Patient> {
        let draft = input.validate()?;
        let now = Utc::now();
        let code = self.store.next_patient_code().await?;
        let mut patient = Patient::new(draft, code, now);
        if self.score_on_create {
            let prediction = self.risk.assess(&patient, now)?;
            patient.set_prediction(prediction);
        }
        self.store.insert_patient(&patient).await?;
        info!(
            "Created patient {} ({}), risk {}",
            patient.patient_code,
            patient.id,
            patient.risk_level().map(|l| l.as_str()).unwrap_or("not scored")
        );
        Ok(patient)
    }

    /// Applies a partial update. The merged record is validated as a whole
    /// and re-scored when a model input changed.
    pub async fn update(&self, id: &Uuid, input: PatientInput) -> Result<Patient> {
        let mut patient = self.store.get_patient(id).await?;
        let rescore = input.touches_risk_factors() && (patient.prediction.is_some() || self.score_on_create);
        let draft = input.merged_over(&patient).validate()?;
        let now = Utc::now();
        patient.apply(draft, now);
        if rescore {
            let prediction = self.risk.assess(&patient, now)?;
            patient.set_prediction(prediction);
        }
        self.store.update_patient(&patient).await?;
        debug!("Updated patient {} (rescored: {})", patient.patient_code, rescore);
        Ok(patient)
    }

    /// Re-scores the stored record, replacing its previous prediction.
    pub async fn predict(&self, id: &Uuid) -> Result<Patient> {
        let mut patient = self.store.get_patient(id).await?;
        let prediction = self.risk.assess(&patient, Utc::now())?;
        info!(
            "Predicted {} for patient {} (score {:.3})",
            prediction.risk_level, patient.patient_code, prediction.score
        );
        patient.set_prediction(prediction);
        self.store.update_patient(&patient).await?;
        Ok(patient)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<()> {
        self.store.delete_patient(id).await?;
        info!("Deleted patient {}", id);
        Ok(())
    }

    pub async fn get(&self, id: &Uuid) -> Result<Patient> {
        self.store.get_patient(id).await
    }

    /// Paged, optionally filtered listing. Raw parameters are normalized
    /// against the pagination settings.
    pub async fn list(
        &self,
        page: Option<usize>,
        per_page: Option<usize>,
        search: Option<&str>,
    ) -> Result<PatientPage> {
        let query = PatientQuery::new(page, per_page, search, &self.pagination);
        self.store.query_patients(&query).await
    }

    pub async fn all(&self) -> Result<Vec<Patient>> {
        self.store.all_patients().await
    }

    /// Creates every valid item. Invalid items are reported, not fatal;
    /// storage or model failures abort the batch.
    pub async fn bulk_create(&self, inputs: Vec<PatientInput>) -> Result<BulkCreateReport> {
        self.bulk_create_decoded(inputs.into_iter().map(Ok).collect()).await
    }

    /// Like `bulk_create`, for items whose decoding may already have failed.
    /// A decode failure is reported under the item's index like any other
    /// validation failure.
    pub async fn bulk_create_decoded(
        &self,
        items: Vec<ValidationResult<PatientInput>>,
    ) -> Result<BulkCreateReport> {
        let mut report = BulkCreateReport::default();
        for (index, item) in items.into_iter().enumerate() {
            let outcome = match item {
                Ok(input) => self.create(input).await,
                Err(e) => Err(StrokeError::Validation(e)),
            };
            match outcome {
                Ok(_) => report.created_count += 1,
                Err(StrokeError::Validation(e)) => {
                    let details: Vec<String> = e.field_errors().iter().map(ToString::to_string).collect();
                    report.errors.push(format!("Patient {}: {}", index, details.join("; ")));
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "Bulk create: {} created, {} rejected",
            report.created_count,
            report.errors.len()
        );
        Ok(report)
    }

    /// Recomputes the prediction of every stored patient.
    pub async fn rescore_all(&self) -> Result<RescoreReport> {
        let mut report = RescoreReport::default();
        let now = Utc::now();
        for mut patient in self.store.all_patients().await? {
            match self.risk.assess(&patient, now) {
                Ok(prediction) => {
                    patient.set_prediction(prediction);
                    self.store.update_patient(&patient).await?;
                    report.scored += 1;
                }
                Err(e) => {
                    warn!("Could not score patient {}: {}", patient.patient_code, e);
                    report.failed += 1;
                }
            }
        }
        self.store.flush().await?;
        info!("Rescored {} patients, {} failed", report.scored, report.failed);
        Ok(report)
    }

    /// Loads the demo patients into an empty store. Returns how many were
    /// added; a store that already has patients is left alone.
    pub async fn seed_samples(&self) -> Result<usize> {
        if self.store.count_patients().await? > 0 {
            debug!("Patient store not empty, skipping sample data");
            return Ok(0);
        }
        let samples = sample_inputs();
        let count = samples.len();
        for input in samples {
            self.create(input).await?;
        }
        info!("{} sample patients created", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{ClassifierError, ClinicalPointsScorer, FeatureVector, RiskCategorizer, RiskScorer};
    use crate::storage_engine::InMemoryPatientStorage;
    use models::medical::RiskLevel;

    #[derive(Debug)]
    struct FailingScorer;

    impl RiskScorer for FailingScorer {
        fn score(&self, _features: &FeatureVector) -> std::result::Result<f64, ClassifierError> {
            Err(ClassifierError::FeatureMismatch("missing feature work_type".into()))
        }
        fn decision_threshold(&self) -> f64 {
            0.5
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn service_with(scorer: Arc<dyn RiskScorer>, score_on_create: bool) -> PatientService {
        PatientService::new(
            Arc::new(InMemoryPatientStorage::new()),
            RiskEngine::new(scorer, RiskCategorizer::default()),
            score_on_create,
            PaginationConfig::default(),
        )
    }

    fn service(score_on_create: bool) -> PatientService {
        service_with(Arc::new(ClinicalPointsScorer), score_on_create)
    }

    fn john() -> PatientInput {
        sample_inputs().remove(0)
    }

    #[tokio::test]
    async fn create_scores_and_persists() {
        let service = service(true);
        let created = service.create(john()).await.unwrap();
        assert_eq!(created.patient_code.as_ref(), "PT00001");
        // 65 points from the clinical rules.
        assert_eq!(created.risk_level(), Some(RiskLevel::Medium));

        let fetched = service.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name.as_deref(), Some("John Smith"));
        assert_eq!(fetched.avg_glucose_level, 185.5);
    }

    #[tokio::test]
    async fn create_without_scoring_leaves_slot_empty() {
        let service = service(false);
        let created = service.create(john()).await.unwrap();
        assert!(created.prediction.is_none());
    }

    #[tokio::test]
    async fn scoring_failure_persists_nothing() {
        let service = service_with(Arc::new(FailingScorer), true);
        let err = service.create(john()).await.unwrap_err();
        assert!(matches!(err, StrokeError::Risk(ClassifierError::FeatureMismatch(_))));
        assert_eq!(service.store().count_patients().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_with_fields() {
        let service = service(true);
        let input = PatientInput {
            age: Some(150.0),
            ..john()
        };
        match service.create(input).await {
            Err(StrokeError::Validation(e)) => assert_eq!(e.field_errors()[0].field, "age"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn predict_overwrites_single_slot() {
        let service = service(false);
        let created = service.create(john()).await.unwrap();

        let first = service.predict(&created.id).await.unwrap();
        let first_at = first.predicted_at().unwrap();
        let second = service.predict(&created.id).await.unwrap();
        assert!(second.predicted_at().unwrap() >= first_at);
        assert_eq!(second.risk_score(), first.risk_score());
        assert_eq!(service.get(&created.id).await.unwrap().prediction, second.prediction);
    }

    #[tokio::test]
    async fn update_rescores_only_when_risk_inputs_change() {
        let service = service(true);
        let created = service.create(john()).await.unwrap();
        let before = created.prediction.clone().unwrap();

        let notes_only = PatientInput {
            notes: Some("Seen by neurology".into()),
            ..PatientInput::default()
        };
        let updated = service.update(&created.id, notes_only).await.unwrap();
        assert_eq!(updated.prediction.as_ref(), Some(&before));
        assert_eq!(updated.notes.as_deref(), Some("Seen by neurology"));

        let heart = PatientInput {
            heart_disease: Some(true),
            ..PatientInput::default()
        };
        let updated = service.update(&created.id, heart).await.unwrap();
        // 65 + 15 points
        assert_eq!(updated.risk_level(), Some(RiskLevel::High));
        assert_eq!(updated.patient_code, created.patient_code);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_validates_merged_record() {
        let service = service(true);
        let created = service.create(john()).await.unwrap();
        let bad = PatientInput {
            bmi: Some(2.0),
            ..PatientInput::default()
        };
        assert!(matches!(
            service.update(&created.id, bad).await,
            Err(StrokeError::Validation(_))
        ));
        assert_eq!(service.get(&created.id).await.unwrap().bmi, 28.3);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let service = service(true);
        let created = service.create(john()).await.unwrap();
        service.delete(&created.id).await.unwrap();
        assert!(matches!(service.get(&created.id).await, Err(StrokeError::NotFound(_))));
        assert!(matches!(service.predict(&created.id).await, Err(StrokeError::NotFound(_))));
    }

    #[tokio::test]
    async fn bulk_create_reports_bad_items_by_index() {
        let service = service(true);
        let mut inputs = sample_inputs();
        inputs.insert(1, PatientInput { gender: None, ..john() });
        let report = service.bulk_create(inputs).await.unwrap();
        assert_eq!(report.created_count, 5);
        assert_eq!(report.errors, vec!["Patient 1: gender: gender is required".to_string()]);
    }

    #[tokio::test]
    async fn bulk_create_reports_undecodable_items_by_index() {
        let service = service(true);
        let items = vec![
            Ok(john()),
            Err(models::errors::ValidationError::field("age", "invalid type")),
        ];
        let report = service.bulk_create_decoded(items).await.unwrap();
        assert_eq!(report.created_count, 1);
        assert_eq!(report.errors, vec!["Patient 1: age: invalid type".to_string()]);
    }

    #[tokio::test]
    async fn seed_only_fills_empty_store() {
        let service = service(true);
        assert_eq!(service.seed_samples().await.unwrap(), 5);
        assert_eq!(service.seed_samples().await.unwrap(), 0);
        let page = service.list(Some(1), Some(2), None).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.patients.len(), 2);
    }

    #[tokio::test]
    async fn rescore_all_fills_every_slot() {
        let service = service(false);
        service.seed_samples().await.unwrap();
        let report = service.rescore_all().await.unwrap();
        assert_eq!(report, RescoreReport { scored: 5, failed: 0 });
        assert!(service.all().await.unwrap().iter().all(|p| p.prediction.is_some()));
    }
}
