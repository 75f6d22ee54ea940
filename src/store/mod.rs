pub mod keys;
pub mod operations;
pub mod trees;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub questions: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("corrupt value under key {key}")]
    Corrupt { key: String },
}

impl Store {
    pub fn open(sled_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let questions = db.open_tree(trees::QUESTIONS)?;
        let meta = db.open_tree(trees::META)?;
        Ok(Self { db, questions, meta })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
