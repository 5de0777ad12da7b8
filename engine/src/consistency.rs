//! Cross-collection consistency checks.
//!
//! The backing store cannot write two collections atomically, so a crash or
//! an unlucky sync can leave a reservation half applied. [`Inventory::check`]
//! finds such states and [`Inventory::repair`] rebuilds the derived side
//! from the authoritative one.

use crate::{error::Result, CollectionKind, Error, Inventory, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A partially applied multi-collection write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inconsistency {
    /// A project reserves an item whose index does not list the project.
    MissingIndexMembership { item_id: RecordId, project_id: RecordId },
    /// An item's index lists a project that holds no reservation of it.
    OrphanIndexMembership { item_id: RecordId, project_id: RecordId },
    /// A project reserves an item that does not exist.
    UnknownItemReservation { project_id: RecordId, item_id: RecordId },
    /// A spot lists an item that does not exist.
    DanglingSpotReference { spot_id: RecordId, item_id: RecordId },
}

/// What a repair pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub fixed: Vec<Inconsistency>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }
}

impl Inventory {
    /// List every inconsistency between items, projects and spots.
    pub fn check(&self) -> Vec<Inconsistency> {
        let mut found = Vec::new();
        let item_ids: HashSet<&str> = self.items.iter().map(|i| i.id.as_str()).collect();

        let mut holders: HashMap<&str, HashSet<&str>> = HashMap::new();
        for project in &self.projects {
            for reservation in &project.reserved {
                if !item_ids.contains(reservation.item_id.as_str()) {
                    found.push(Inconsistency::UnknownItemReservation {
                        project_id: project.id.clone(),
                        item_id: reservation.item_id.clone(),
                    });
                    continue;
                }
                holders
                    .entry(reservation.item_id.as_str())
                    .or_default()
                    .insert(project.id.as_str());
            }
        }

        for item in &self.items {
            let expected = holders.get(item.id.as_str());
            if let Some(expected) = expected {
                let mut missing: Vec<&str> = expected
                    .iter()
                    .copied()
                    .filter(|p| !item.is_reserved_by(p))
                    .collect();
                missing.sort_unstable();
                for project_id in missing {
                    found.push(Inconsistency::MissingIndexMembership {
                        item_id: item.id.clone(),
                        project_id: project_id.to_string(),
                    });
                }
            }
            for project_id in &item.reserved {
                if !expected.is_some_and(|e| e.contains(project_id.as_str())) {
                    found.push(Inconsistency::OrphanIndexMembership {
                        item_id: item.id.clone(),
                        project_id: project_id.clone(),
                    });
                }
            }
        }

        for spot in &self.spots {
            for item_id in &spot.reserved_items {
                if !item_ids.contains(item_id.as_str()) {
                    found.push(Inconsistency::DanglingSpotReference {
                        spot_id: spot.spot_id.clone(),
                        item_id: item_id.clone(),
                    });
                }
            }
        }

        found
    }

    /// Fail with [`Error::TransactionInconsistency`] if [`Inventory::check`]
    /// finds anything.
    pub fn verify(&self) -> Result<()> {
        let found = self.check();
        if found.is_empty() {
            Ok(())
        } else {
            Err(Error::TransactionInconsistency(found))
        }
    }

    /// Rebuild item indexes from the projects and drop dangling references.
    pub fn repair(&mut self) -> RepairReport {
        let fixed = self.check();
        if fixed.is_empty() {
            return RepairReport::default();
        }

        let item_ids: HashSet<RecordId> = self.items.iter().map(|i| i.id.clone()).collect();

        for project in &mut self.projects {
            project
                .reserved
                .retain(|r| item_ids.contains(&r.item_id));
        }

        for item in &mut self.items {
            item.reserved = self
                .projects
                .iter()
                .filter(|p| p.reservation(&item.id).is_some())
                .map(|p| p.id.clone())
                .collect();
        }

        for spot in &mut self.spots {
            spot.reserved_items.retain(|i| item_ids.contains(i));
        }

        for kind in [
            CollectionKind::Projects,
            CollectionKind::Spots,
            CollectionKind::WarehouseItems,
        ] {
            self.touch(kind);
        }

        RepairReport { fixed }
    }
}
