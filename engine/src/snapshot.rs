//! Read-only snapshots handed to the presentation layer.
//!
//! A snapshot copies every collection list and the sync tokens at one
//! point in time. Uses BTreeMap for deterministic serialization order.

use crate::{
    error::Result,
    record::{decode_all, Record},
    CategoryScope, Category, CollectionKind, Error, Item, Project, Spot, SyncState,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of all collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Records per collection
    pub collections: BTreeMap<CollectionKind, Vec<Value>>,
    /// Sync tokens at snapshot time
    pub sync_state: SyncState,
}

impl InventorySnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            collections: BTreeMap::new(),
            sync_state: SyncState::new(),
        }
    }

    /// Set the records of a collection.
    pub fn insert(&mut self, kind: CollectionKind, records: Vec<Value>) {
        self.collections.insert(kind, records);
    }

    /// Raw records of a collection, empty if absent.
    pub fn collection(&self, kind: CollectionKind) -> &[Value] {
        self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Decode a collection into typed records.
    pub fn records<R: Record>(&self) -> Result<Vec<R>> {
        decode_all(self.collection(R::COLLECTION).to_vec())
    }

    pub fn items(&self) -> Result<Vec<Item>> {
        self.records()
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        self.records()
    }

    pub fn spots(&self) -> Result<Vec<Spot>> {
        self.records()
    }

    /// Categories of one namespace.
    pub fn categories(&self, scope: CategoryScope) -> Result<Vec<Category>> {
        self.collection(scope.collection())
            .iter()
            .cloned()
            .map(|value| Category::decode(scope, value))
            .collect()
    }

    /// Count records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Protocol(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::Protocol(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::Protocol(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl Default for InventorySnapshot {
    fn default() -> Self {
        Self::new()
    }
}
