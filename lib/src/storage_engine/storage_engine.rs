// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::identifiers::PatientCode;
use models::medical::{Patient, User};

use crate::config::PaginationConfig;
use crate::errors::Result;
use crate::storage_engine::storage_utils::paginate;

/// Search and paging parameters for patient listings. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientQuery {
    /// Lowercased, trimmed search needle. `None` lists everything.
    pub search: Option<String>,
    pub page: usize,
    pub per_page: usize,
}

impl PatientQuery {
    /// Normalizes raw request parameters: page at least 1, `per_page`
    /// defaulted and capped per configuration, blank search dropped.
    pub fn new(
        page: Option<usize>,
        per_page: Option<usize>,
        search: Option<&str>,
        pagination: &PaginationConfig,
    ) -> Self {
        let per_page = per_page
            .unwrap_or(pagination.default_per_page)
            .clamp(1, pagination.max_per_page);
        PatientQuery {
            search: search
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            page: page.unwrap_or(1).max(1),
            per_page,
        }
    }
}

impl Default for PatientQuery {
    fn default() -> Self {
        PatientQuery::new(None, None, None, &PaginationConfig::default())
    }
}

/// One page of a patient listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    /// Matching records across all pages.
    pub total: u64,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

#[async_trait]
pub trait PatientStorageEngine: Send + Sync + 'static {
    /// Allocates the next human-readable patient code. Codes are never reused,
    /// even after deletes.
    async fn next_patient_code(&self) -> Result<PatientCode>;
    /// Inserts a new record. Fails with `AlreadyExists` if the id is taken.
    async fn insert_patient(&self, patient: &Patient) -> Result<()>;
    /// Replaces an existing record. Fails with `NotFound` if it is absent.
    async fn update_patient(&self, patient: &Patient) -> Result<()>;
    /// Fails with `NotFound` on an unknown id.
    async fn get_patient(&self, id: &Uuid) -> Result<Patient>;
    /// Fails with `NotFound` on an unknown id.
    async fn delete_patient(&self, id: &Uuid) -> Result<()>;
    /// Every record, newest `created_at` first.
    async fn all_patients(&self) -> Result<Vec<Patient>>;
    async fn count_patients(&self) -> Result<u64>;
    async fn flush(&self) -> Result<()>;
    fn get_type(&self) -> &'static str;

    /// Filtered, paged listing.
    async fn query_patients(&self, query: &PatientQuery) -> Result<PatientPage> {
        let patients = self.all_patients().await?;
        Ok(paginate(patients, query))
    }
}

#[async_trait]
pub trait UserStorageEngine: Send + Sync + 'static {
    /// Adds a new user. Fails with `AlreadyExists` if the email is taken.
    async fn add_user(&self, user: &User) -> Result<()>;
    /// Updates an existing user, keyed by email.
    async fn update_user(&self, user: &User) -> Result<()>;
    /// `email` must already be normalized.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Note: a full scan for the sled engine, users are keyed by email.
    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>>;
    async fn count_users(&self) -> Result<u64>;
}
