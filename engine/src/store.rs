//! Inventory - the in-memory working set of the ledger collections.
//!
//! An [`Inventory`] holds the items, projects and spots decoded from their
//! persisted lists. Ledger and spot operations mutate it and mark the
//! collections they touched; the caller persists exactly those.

use crate::{
    error::Result,
    record::{decode_all, encode_all},
    CollectionKind, Error, Item, Project, Spot,
};
use serde_json::Value;
use std::collections::BTreeSet;

/// Order in which touched collections are written back.
///
/// Project lists carry the authoritative quantities and go first; the item
/// index can always be rebuilt from them.
pub const PERSIST_ORDER: [CollectionKind; 3] = [
    CollectionKind::Projects,
    CollectionKind::Spots,
    CollectionKind::WarehouseItems,
];

/// Working set of items, projects and spots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub(crate) items: Vec<Item>,
    pub(crate) projects: Vec<Project>,
    pub(crate) spots: Vec<Spot>,
    dirty: BTreeSet<CollectionKind>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an inventory from the persisted JSON lists.
    pub fn from_collections(
        items: Vec<Value>,
        projects: Vec<Value>,
        spots: Vec<Value>,
    ) -> Result<Self> {
        Ok(Self {
            items: decode_all(items)?,
            projects: decode_all(projects)?,
            spots: decode_all(spots)?,
            dirty: BTreeSet::new(),
        })
    }

    /// Encode one of the ledger collections.
    pub fn export(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        match kind {
            CollectionKind::WarehouseItems => encode_all(&self.items),
            CollectionKind::Projects => encode_all(&self.projects),
            CollectionKind::Spots => encode_all(&self.spots),
            other => Err(Error::UnknownCollection(other.as_str().to_string())),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn spot(&self, spot_id: &str) -> Option<&Spot> {
        self.spots.iter().find(|s| s.spot_id == spot_id)
    }

    /// Add a locally created item.
    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        if self.item(&item.id).is_some() {
            return Err(Error::RecordAlreadyExists(item.id));
        }
        if item.count < 0 {
            return Err(Error::Validation(format!(
                "item count must not be negative, got {}",
                item.count
            )));
        }
        self.items.push(item);
        self.touch(CollectionKind::WarehouseItems);
        Ok(())
    }

    /// Add a locally created project.
    pub fn insert_project(&mut self, project: Project) -> Result<()> {
        if self.project(&project.id).is_some() {
            return Err(Error::RecordAlreadyExists(project.id));
        }
        self.projects.push(project);
        self.touch(CollectionKind::Projects);
        Ok(())
    }

    /// Add a locally created spot.
    pub fn insert_spot(&mut self, spot: Spot) -> Result<()> {
        if self.spot(&spot.spot_id).is_some() {
            return Err(Error::RecordAlreadyExists(spot.spot_id));
        }
        self.spots.push(spot);
        self.touch(CollectionKind::Spots);
        Ok(())
    }

    /// Collections modified since the last [`Inventory::take_dirty`], in
    /// persist order.
    pub fn dirty(&self) -> Vec<CollectionKind> {
        PERSIST_ORDER
            .into_iter()
            .filter(|kind| self.dirty.contains(kind))
            .collect()
    }

    /// Return and clear the modified collections.
    pub fn take_dirty(&mut self) -> Vec<CollectionKind> {
        let dirty = self.dirty();
        self.dirty.clear();
        dirty
    }

    pub(crate) fn touch(&mut self, kind: CollectionKind) {
        self.dirty.insert(kind);
    }

    pub(crate) fn item_index(&self, id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))
    }

    pub(crate) fn project_index(&self, id: &str) -> Result<usize> {
        self.projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))
    }

    pub(crate) fn spot_index(&self, spot_id: &str) -> Result<usize> {
        self.spots
            .iter()
            .position(|s| s.spot_id == spot_id)
            .ok_or_else(|| Error::SpotNotFound(spot_id.to_string()))
    }
}
