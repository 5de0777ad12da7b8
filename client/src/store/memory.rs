//! In-memory store.

use super::{KeyedStore, StoreError};
use dashmap::DashMap;
use serde_json::Value;

/// Store keeping every list in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: DashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the given lists.
    pub fn with_lists<I, K>(lists: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<Value>)>,
        K: Into<String>,
    {
        Self {
            lists: lists.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Names that hold a list.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lists.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl KeyedStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .lists
            .get(name)
            .map(|list| list.value().clone())
            .unwrap_or_default())
    }

    async fn set(&self, name: &str, records: Vec<Value>) -> Result<(), StoreError> {
        self.lists.insert(name.to_string(), records);
        Ok(())
    }
}
