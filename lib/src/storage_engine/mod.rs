// lib/src/storage_engine/mod.rs

pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;
pub mod storage_utils;
pub mod user_storage;

pub use inmemory_storage::{InMemoryPatientStorage, InMemoryUserStorage};
pub use sled_storage::{open_sled_db, SledPatientStorage};
pub use storage_engine::{PatientPage, PatientQuery, PatientStorageEngine, UserStorageEngine};
pub use user_storage::SledUserStorage;

use std::sync::Arc;

use log::info;

use crate::config::{StorageConfig, StorageEngineType};
use crate::errors::Result;

/// The patient and user stores opened from one configuration.
#[derive(Clone)]
pub struct Storage {
    pub patients: Arc<dyn PatientStorageEngine>,
    pub users: Arc<dyn UserStorageEngine>,
}

impl Storage {
    pub fn in_memory() -> Self {
        Storage {
            patients: Arc::new(InMemoryPatientStorage::new()),
            users: Arc::new(InMemoryUserStorage::new()),
        }
    }
}

/// Creates the storage engines selected by `config`. Sled keeps patients,
/// users and metadata as trees of one database directory.
pub fn create_storage(config: &StorageConfig) -> Result<Storage> {
    let storage = match config.engine_type {
        StorageEngineType::Sled => {
            let db = open_sled_db(&config.data_directory, config.cache_capacity)?;
            Storage {
                patients: Arc::new(SledPatientStorage::new(&db)?),
                users: Arc::new(SledUserStorage::new(&db)?),
            }
        }
        StorageEngineType::InMemory => Storage::in_memory(),
    };
    info!("Using {} storage engine", storage.patients.get_type());
    Ok(storage)
}
