// lib/src/storage_engine/inmemory_storage.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::identifiers::PatientCode;
use models::medical::{Patient, User};

use crate::errors::{Result, StrokeError};
use crate::storage_engine::storage_engine::{PatientStorageEngine, UserStorageEngine};
use crate::storage_engine::storage_utils::newest_first;

/// Volatile patient store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct InMemoryPatientStorage {
    patients: Arc<RwLock<HashMap<Uuid, Patient>>>,
    sequence: AtomicU64,
}

impl InMemoryPatientStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStorageEngine for InMemoryPatientStorage {
    async fn next_patient_code(&self) -> Result<PatientCode> {
        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PatientCode::from_sequence(next))
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        let mut patients = self.patients.write().await;
        if patients.contains_key(&patient.id) {
            return Err(StrokeError::AlreadyExists(format!("patient {}", patient.id)));
        }
        patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn update_patient(&self, patient: &Patient) -> Result<()> {
        let mut patients = self.patients.write().await;
        match patients.get_mut(&patient.id) {
            Some(slot) => {
                *slot = patient.clone();
                Ok(())
            }
            None => Err(StrokeError::patient_not_found(patient.id)),
        }
    }

    async fn get_patient(&self, id: &Uuid) -> Result<Patient> {
        self.patients
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StrokeError::patient_not_found(id))
    }

    async fn delete_patient(&self, id: &Uuid) -> Result<()> {
        self.patients
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StrokeError::patient_not_found(id))
    }

    async fn all_patients(&self) -> Result<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.patients.read().await.values().cloned().collect();
        patients.sort_by(newest_first);
        Ok(patients)
    }

    async fn count_patients(&self) -> Result<u64> {
        Ok(self.patients.read().await.len() as u64)
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn get_type(&self) -> &'static str {
        "inmemory"
    }
}

/// Volatile user store keyed by normalized email.
#[derive(Debug, Default)]
pub struct InMemoryUserStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStorageEngine for InMemoryUserStorage {
    async fn add_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StrokeError::AlreadyExists(format!("user {}", user.email)));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.email) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(StrokeError::user_not_found(&user.email)),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.values().find(|u| u.id == *id).cloned())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.users.read().await.len() as u64)
    }
}
