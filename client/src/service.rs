//! Serialized inventory operations over a keyed store.
//!
//! Every mutation loads the ledger collections, applies one engine
//! operation and writes back the touched collections while holding the
//! writer lock. The sync merge step takes the same lock, so local edits
//! and pulled state never interleave.

use crate::error::Result;
use crate::store::KeyedStore;
use inventory_engine::{
    merge, CategoryScope, Category, CollectionKind, DeletePolicy, Inconsistency, Inventory,
    InventorySnapshot, Item, ItemReservation, MergeReport, Project, PullResponse, Record,
    ReleaseMode, RepairReport, Reservation, Spot, SyncState,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Store key holding the per-collection sync tokens.
pub const SYNC_STATE_KEY: &str = "lastSync";

/// What one applied pull changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedPull {
    pub merged: BTreeMap<CollectionKind, MergeReport>,
    pub sync_state: SyncState,
}

/// Inventory operations with a single-writer queue.
#[derive(Debug)]
pub struct InventoryService<S> {
    store: Arc<S>,
    writer: Arc<Mutex<()>>,
}

impl<S> Clone for InventoryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<S: KeyedStore> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create an item with a fresh id.
    pub async fn create_item(&self, name: &str, count: i64) -> Result<Item> {
        let item = Item::new(Uuid::new_v4().to_string(), name, count);
        let created = item.clone();
        self.mutate(move |inv| inv.insert_item(item)).await?;
        tracing::info!("Created item {}", created.id);
        Ok(created)
    }

    /// Create a project with a fresh id, stamped with the creation time.
    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let mut project = Project::new(Uuid::new_v4().to_string(), name);
        project.date_created = Some(chrono::Utc::now().to_rfc3339());
        let created = project.clone();
        self.mutate(move |inv| inv.insert_project(project)).await?;
        tracing::info!("Created project {}", created.id);
        Ok(created)
    }

    /// Create a storage spot with a fresh id.
    pub async fn create_spot(&self, description: &str) -> Result<Spot> {
        let spot = Spot::new(Uuid::new_v4().to_string(), description);
        let created = spot.clone();
        self.mutate(move |inv| inv.insert_spot(spot)).await?;
        Ok(created)
    }

    /// Add a category to the warehouse or project namespace.
    pub async fn create_category(&self, scope: CategoryScope, name: &str) -> Result<Category> {
        let category = Category::new(scope, Uuid::new_v4().to_string(), name);
        self.append(&category).await?;
        tracing::info!("Created {} category {}", scope.collection(), category.id);
        Ok(category)
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    pub async fn reserve(&self, item_id: &str, project_id: &str, amount: i64) -> Result<Reservation> {
        self.mutate(|inv| inv.reserve(item_id, project_id, amount)).await
    }

    pub async fn release(&self, item_id: &str, project_id: &str, mode: ReleaseMode) -> Result<Reservation> {
        self.mutate(|inv| inv.release(item_id, project_id, mode)).await
    }

    pub async fn adjust_count(&self, item_id: &str, project_id: &str, delta: i64) -> Result<Reservation> {
        self.mutate(|inv| inv.adjust_count(item_id, project_id, delta)).await
    }

    pub async fn delete_item(&self, item_id: &str, policy: DeletePolicy) -> Result<Item> {
        let item = self.mutate(|inv| inv.delete_item(item_id, policy)).await?;
        tracing::info!("Deleted item {} ({:?})", item_id, policy);
        Ok(item)
    }

    pub async fn delete_project(&self, project_id: &str, mode: ReleaseMode) -> Result<Project> {
        self.mutate(|inv| inv.delete_project(project_id, mode)).await
    }

    pub async fn finish_project(&self, project_id: &str) -> Result<Vec<Reservation>> {
        self.mutate(|inv| inv.finish_project(project_id)).await
    }

    pub async fn reservations_for_item(&self, item_id: &str) -> Result<Vec<ItemReservation>> {
        Ok(self.read().await?.reservations_for_item(item_id))
    }

    pub async fn capacity(&self, item_id: &str) -> Result<i64> {
        Ok(self.read().await?.capacity(item_id)?)
    }

    // ------------------------------------------------------------------
    // Spots
    // ------------------------------------------------------------------

    pub async fn assign(&self, spot_id: &str, item_id: &str) -> Result<bool> {
        self.mutate(|inv| inv.assign(spot_id, item_id)).await
    }

    pub async fn unassign(&self, spot_id: &str, item_id: &str) -> Result<bool> {
        self.mutate(|inv| inv.unassign(spot_id, item_id)).await
    }

    pub async fn spots_for_item(&self, item_id: &str) -> Result<Vec<String>> {
        Ok(self.read().await?.spots_for_item(item_id))
    }

    // ------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------

    pub async fn check(&self) -> Result<Vec<Inconsistency>> {
        Ok(self.read().await?.check())
    }

    pub async fn verify(&self) -> Result<()> {
        Ok(self.read().await?.verify()?)
    }

    /// Rebuild derived indexes and persist the result.
    pub async fn repair(&self) -> Result<RepairReport> {
        let report = self.mutate(|inv| Ok(inv.repair())).await?;
        if !report.is_empty() {
            tracing::warn!("Repaired {} inconsistencies", report.fixed.len());
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Raw records of one collection.
    pub async fn collection(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        Ok(self.store.get(kind.as_str()).await?)
    }

    /// Typed records of one collection.
    pub async fn records<R: Record>(&self) -> Result<Vec<R>> {
        let values = self.collection(R::COLLECTION).await?;
        Ok(inventory_engine::record::decode_all(values)?)
    }

    /// Stored sync tokens.
    pub async fn sync_state(&self) -> Result<SyncState> {
        let records = self.store.get(SYNC_STATE_KEY).await?;
        Ok(SyncState::from_records(&records))
    }

    /// Copy of every collection and the sync tokens, taken between writes.
    pub async fn snapshot(&self) -> Result<InventorySnapshot> {
        let _guard = self.writer.lock().await;
        let mut snapshot = InventorySnapshot::new();
        for kind in CollectionKind::ALL {
            snapshot.insert(kind, self.store.get(kind.as_str()).await?);
        }
        snapshot.sync_state = SyncState::from_records(&self.store.get(SYNC_STATE_KEY).await?);
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Merge a pulled response and persist it, sync tokens last.
    ///
    /// If any write fails the tokens are left as they were, so the next
    /// pull asks for the same delta again.
    pub(crate) async fn apply_pull(&self, state: &SyncState, mut response: PullResponse) -> Result<AppliedPull> {
        let _guard = self.writer.lock().await;
        let mut merged = BTreeMap::new();

        for kind in CollectionKind::ALL {
            let batch = response.take_batch(kind);
            if batch.is_empty() {
                continue;
            }

            let existing = self.store.get(kind.as_str()).await?;
            let outcome = merge(kind, existing, batch);
            for skip in &outcome.report.skipped {
                tracing::warn!(
                    "Skipped {} record at index {}: {:?}",
                    kind,
                    skip.index,
                    skip.reason
                );
            }
            tracing::debug!(
                "Merged {}: {} inserted, {} updated",
                kind,
                outcome.report.inserted,
                outcome.report.updated
            );

            self.store.set(kind.as_str(), outcome.records).await?;
            merged.insert(kind, outcome.report);
        }

        let sync_state = state.advanced(&response.updated_timestamps);
        self.store.set(SYNC_STATE_KEY, sync_state.to_records()).await?;

        Ok(AppliedPull { merged, sync_state })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn load(&self) -> Result<Inventory> {
        let items = self.store.get(CollectionKind::WarehouseItems.as_str()).await?;
        let projects = self.store.get(CollectionKind::Projects.as_str()).await?;
        let spots = self.store.get(CollectionKind::Spots.as_str()).await?;
        Ok(Inventory::from_collections(items, projects, spots)?)
    }

    async fn read(&self) -> Result<Inventory> {
        let _guard = self.writer.lock().await;
        self.load().await
    }

    /// Append one record to the end of its collection list.
    async fn append<R: Record>(&self, record: &R) -> Result<()> {
        let encoded = record.to_value()?;
        let kind = record.collection();

        let _guard = self.writer.lock().await;
        let mut list = self.store.get(kind.as_str()).await?;
        list.push(encoded);
        self.store.set(kind.as_str(), list).await?;
        Ok(())
    }

    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Inventory) -> inventory_engine::error::Result<T>,
    {
        let _guard = self.writer.lock().await;
        let mut inventory = self.load().await?;
        let value = op(&mut inventory)?;

        for kind in inventory.take_dirty() {
            let records = inventory.export(kind)?;
            self.store.set(kind.as_str(), records).await?;
        }

        Ok(value)
    }
}
