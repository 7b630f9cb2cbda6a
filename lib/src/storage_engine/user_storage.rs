// lib/src/storage_engine/user_storage.rs

use async_trait::async_trait;
use log::debug;
use sled::{Db, Tree};
use uuid::Uuid;

use models::medical::User;

use crate::errors::{Result, StrokeError};
use crate::storage_engine::storage_engine::UserStorageEngine;
use crate::storage_engine::storage_utils::{deserialize_record, serialize_record};

/// Sled-backed implementation of the `UserStorageEngine` trait.
/// Opens a tree named "users", keyed by normalized email.
pub struct SledUserStorage {
    tree: Tree,
}

impl SledUserStorage {
    pub fn new(db: &Db) -> Result<Self> {
        let tree = db.open_tree("users")?;
        Ok(Self { tree })
    }
}

#[async_trait]
impl UserStorageEngine for SledUserStorage {
    async fn add_user(&self, user: &User) -> Result<()> {
        let user_bytes = serialize_record(user)?;
        self.tree
            .compare_and_swap(user.email.as_bytes(), None as Option<&[u8]>, Some(user_bytes))?
            .map_err(|_| StrokeError::AlreadyExists(format!("user {}", user.email)))?;
        debug!("Added user {} with role {}", user.email, user.role);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        if !self.tree.contains_key(user.email.as_bytes())? {
            return Err(StrokeError::user_not_found(&user.email));
        }
        let user_bytes = serialize_record(user)?;
        self.tree.insert(user.email.as_bytes(), user_bytes)?;
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.tree
            .get(email.as_bytes())?
            .map(|bytes| deserialize_record(&bytes))
            .transpose()
    }

    async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        for item in self.tree.iter() {
            let (_key, value) = item?;
            let user: User = deserialize_record(&value)?;
            if user.id == *id {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.tree.len() as u64)
    }
}
