//! Keyed persistence for collection lists.
//!
//! Each collection is stored as one named list of JSON records and is read
//! and written as a unit.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use serde_json::Value;
use std::future::Future;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Stored list {name} is not a JSON array: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A named, persisted list-of-records store.
///
/// `get` of a name that was never written returns an empty list.
pub trait KeyedStore: Send + Sync + 'static {
    fn get(&self, name: &str) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    fn set(
        &self,
        name: &str,
        records: Vec<Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

fn decode_list(name: &str, raw: &str) -> Result<Vec<Value>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
