// lib/src/storage_engine/sled_storage.rs

use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use sled::{Db, Tree};
use uuid::Uuid;

use models::identifiers::PatientCode;
use models::medical::Patient;

use crate::errors::{Result, StrokeError};
use crate::storage_engine::storage_engine::PatientStorageEngine;
use crate::storage_engine::storage_utils::{deserialize_record, newest_first, serialize_record};

const PATIENTS_TREE: &str = "patients";
const META_TREE: &str = "meta";
const PATIENT_SEQUENCE_KEY: &[u8] = b"patient_sequence";

/// Opens (creating if needed) the sled database under `path`.
pub fn open_sled_db(path: &Path, cache_capacity: u64) -> Result<Db> {
    std::fs::create_dir_all(path)?;
    let db = sled::Config::new()
        .path(path)
        .cache_capacity(cache_capacity)
        .open()?;
    info!("Opened sled database at {:?}", path);
    Ok(db)
}

/// Sled-backed patient store. Records live in the `patients` tree keyed by
/// their UUID bytes; the code sequence lives in the `meta` tree.
pub struct SledPatientStorage {
    db: Db,
    patients: Tree,
    meta: Tree,
}

impl SledPatientStorage {
    pub fn new(db: &Db) -> Result<Self> {
        Ok(SledPatientStorage {
            db: db.clone(),
            patients: db.open_tree(PATIENTS_TREE)?,
            meta: db.open_tree(META_TREE)?,
        })
    }
}

fn increment(old: Option<&[u8]>) -> Option<Vec<u8>> {
    let current = old
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0);
    Some((current + 1).to_be_bytes().to_vec())
}

#[async_trait]
impl PatientStorageEngine for SledPatientStorage {
    async fn next_patient_code(&self) -> Result<PatientCode> {
        let updated = self
            .meta
            .update_and_fetch(PATIENT_SEQUENCE_KEY, increment)?
            .ok_or_else(|| StrokeError::DatabaseError("patient sequence missing after update".to_string()))?;
        let bytes = <[u8; 8]>::try_from(updated.as_ref())
            .map_err(|_| StrokeError::DatabaseError("corrupt patient sequence".to_string()))?;
        Ok(PatientCode::from_sequence(u64::from_be_bytes(bytes)))
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        let bytes = serialize_record(patient)?;
        self.patients
            .compare_and_swap(patient.id.as_bytes(), None as Option<&[u8]>, Some(bytes))?
            .map_err(|_| StrokeError::AlreadyExists(format!("patient {}", patient.id)))?;
        debug!("Inserted patient {} ({})", patient.patient_code, patient.id);
        Ok(())
    }

    async fn update_patient(&self, patient: &Patient) -> Result<()> {
        let key = patient.id.as_bytes();
        let bytes = serialize_record(patient)?;
        // Swaps only over the value read; a key deleted meanwhile stays absent.
        let mut current = self.patients.get(key)?;
        loop {
            let Some(old) = current else {
                return Err(StrokeError::patient_not_found(patient.id));
            };
            match self.patients.compare_and_swap(key, Some(old), Some(bytes.clone()))? {
                Ok(()) => break,
                Err(conflict) => current = conflict.current,
            }
        }
        debug!("Updated patient {}", patient.id);
        Ok(())
    }

    async fn get_patient(&self, id: &Uuid) -> Result<Patient> {
        match self.patients.get(id.as_bytes())? {
            Some(bytes) => deserialize_record(&bytes),
            None => Err(StrokeError::patient_not_found(id)),
        }
    }

    async fn delete_patient(&self, id: &Uuid) -> Result<()> {
        match self.patients.remove(id.as_bytes())? {
            Some(_) => {
                debug!("Deleted patient {}", id);
                Ok(())
            }
            None => Err(StrokeError::patient_not_found(id)),
        }
    }

    async fn all_patients(&self) -> Result<Vec<Patient>> {
        let mut patients = Vec::with_capacity(self.patients.len());
        for item in self.patients.iter() {
            let (_key, value) = item?;
            patients.push(deserialize_record::<Patient>(&value)?);
        }
        patients.sort_by(newest_first);
        Ok(patients)
    }

    async fn count_patients(&self) -> Result<u64> {
        Ok(self.patients.len() as u64)
    }

    async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn get_type(&self) -> &'static str {
        "sled"
    }
}
