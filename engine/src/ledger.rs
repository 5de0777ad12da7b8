//! Reservation ledger.
//!
//! Reservations link two collections: the project's `reserved` list holds
//! the quantities, and the item's `reserved` list indexes which projects
//! hold any. Every operation here updates both sides in one call so no
//! caller sees one without the other.
//!
//! An item's `count` is always the number of units still available. A
//! reservation moves units out of `count` and into the project entry;
//! releasing either returns them (`Restore`) or drops them as consumed
//! (`Subtract`). The capacity of an item is therefore
//! `count + sum(reservations)`, and only a subtracting release shrinks it.

use crate::{error::Result, CollectionKind, Error, Inventory, Item, Project, RecordId, Reservation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happens to the units of a released reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseMode {
    /// Units were used up; the item's count is left alone.
    Subtract,
    /// Units go back on the shelf; the item's count grows by the amount.
    Restore,
}

/// How deleting an item treats existing reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeletePolicy {
    /// Fail with [`Error::ItemReserved`] while any project holds the item.
    #[default]
    RefuseIfReserved,
    /// Strip the item from every project's reservations.
    Cascade,
}

/// One project's reservation of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReservation {
    pub project_id: RecordId,
    pub project_name: String,
    pub count: i64,
}

impl Inventory {
    /// Reserve `amount` units of an item for a project.
    ///
    /// `amount` must be positive and strictly below the units still
    /// available. Returns the project's resulting reservation entry.
    pub fn reserve(&mut self, item_id: &str, project_id: &str, amount: i64) -> Result<Reservation> {
        if amount <= 0 {
            return Err(Error::Validation(format!(
                "reservation amount must be positive, got {amount}"
            )));
        }

        let i = self.item_index(item_id)?;
        let p = self.project_index(project_id)?;
        let item = &mut self.items[i];
        let project = &mut self.projects[p];

        ensure_available(item, amount)?;
        let held = project.reservation(item_id).map_or(0, |r| r.count);
        let total = add_units(item_id, held, amount)?;

        item.count -= amount;
        item.add_membership(project_id);

        let entry = match project.reservation_mut(item_id) {
            Some(entry) => {
                entry.count = total;
                entry.clone()
            }
            None => {
                let entry = Reservation::new(item_id, amount);
                project.reserved.push(entry.clone());
                entry
            }
        };

        self.touch(CollectionKind::WarehouseItems);
        self.touch(CollectionKind::Projects);
        Ok(entry)
    }

    /// Release a project's whole reservation of an item.
    ///
    /// Removes the project entry and the item's index membership together.
    /// Returns the released entry.
    pub fn release(&mut self, item_id: &str, project_id: &str, mode: ReleaseMode) -> Result<Reservation> {
        let i = self.item_index(item_id)?;
        let p = self.project_index(project_id)?;
        let missing = || Error::ReservationNotFound {
            item_id: item_id.to_string(),
            project_id: project_id.to_string(),
        };

        let held = self.projects[p].reservation(item_id).ok_or_else(missing)?.count;
        let remaining = match mode {
            ReleaseMode::Restore => add_units(item_id, self.items[i].count, held)?,
            ReleaseMode::Subtract => self.items[i].count,
        };

        let released = self.projects[p].take_reservation(item_id).ok_or_else(missing)?;
        let item = &mut self.items[i];
        item.remove_membership(project_id);
        item.count = remaining;

        self.touch(CollectionKind::WarehouseItems);
        self.touch(CollectionKind::Projects);
        Ok(released)
    }

    /// Change an existing reservation by `delta`, never below one unit.
    ///
    /// Growth draws from the item's available units under the same rule as
    /// [`Inventory::reserve`]; shrinkage returns units to the item.
    pub fn adjust_count(&mut self, item_id: &str, project_id: &str, delta: i64) -> Result<Reservation> {
        let i = self.item_index(item_id)?;
        let p = self.project_index(project_id)?;
        let item = &mut self.items[i];
        let project = &mut self.projects[p];

        let entry = project
            .reservation_mut(item_id)
            .ok_or_else(|| Error::ReservationNotFound {
                item_id: item_id.to_string(),
                project_id: project_id.to_string(),
            })?;

        let target = entry.count.saturating_add(delta).max(1);
        let change = target
            .checked_sub(entry.count)
            .ok_or_else(|| out_of_range(item_id))?;
        if change == 0 {
            return Ok(entry.clone());
        }
        if change > 0 {
            ensure_available(item, change)?;
        }

        item.count = item
            .count
            .checked_sub(change)
            .ok_or_else(|| out_of_range(item_id))?;
        entry.count = target;
        item.add_membership(project_id);
        let entry = entry.clone();

        self.touch(CollectionKind::WarehouseItems);
        self.touch(CollectionKind::Projects);
        Ok(entry)
    }

    /// Every project's reservation of an item, read from the projects.
    pub fn reservations_for_item(&self, item_id: &str) -> Vec<ItemReservation> {
        self.projects
            .iter()
            .filter_map(|project| {
                project.reservation(item_id).map(|r| ItemReservation {
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    count: r.count,
                })
            })
            .collect()
    }

    /// Units available plus units reserved across all projects.
    pub fn capacity(&self, item_id: &str) -> Result<i64> {
        let item = &self.items[self.item_index(item_id)?];
        self.reservations_for_item(item_id)
            .iter()
            .try_fold(item.count, |total, r| add_units(item_id, total, r.count))
    }

    /// Delete an item, cascading to spots and, by policy, to projects.
    ///
    /// Spot references are always removed. Returns the deleted item.
    pub fn delete_item(&mut self, item_id: &str, policy: DeletePolicy) -> Result<Item> {
        let i = self.item_index(item_id)?;

        let holders = self
            .projects
            .iter()
            .filter(|p| p.reservation(item_id).is_some())
            .count();

        if holders > 0 {
            if policy == DeletePolicy::RefuseIfReserved {
                return Err(Error::ItemReserved {
                    item_id: item_id.to_string(),
                    projects: holders,
                });
            }
            for project in &mut self.projects {
                project.take_reservation(item_id);
            }
            self.touch(CollectionKind::Projects);
        }

        self.unassign_everywhere(item_id);

        let item = self.items.remove(i);
        self.touch(CollectionKind::WarehouseItems);
        Ok(item)
    }

    /// Delete a project after releasing all of its reservations.
    ///
    /// Reservations of items that no longer exist are dropped.
    pub fn delete_project(&mut self, project_id: &str, mode: ReleaseMode) -> Result<Project> {
        let p = self.project_index(project_id)?;
        let reserved = self.projects[p].reserved.clone();

        self.return_reservations(project_id, &reserved, mode)?;
        let project = self.projects.remove(p);

        self.touch(CollectionKind::Projects);
        Ok(project)
    }

    /// Mark a project finished, consuming everything it reserved.
    ///
    /// Returns the reservations that were released.
    pub fn finish_project(&mut self, project_id: &str) -> Result<Vec<Reservation>> {
        let p = self.project_index(project_id)?;
        let project = &mut self.projects[p];
        project.finished = true;
        let released = std::mem::take(&mut project.reserved);

        self.return_reservations(project_id, &released, ReleaseMode::Subtract)?;

        self.touch(CollectionKind::Projects);
        Ok(released)
    }

    /// Hand reservations back to their items. Counts are computed for every
    /// item before any is written, so an out-of-range restore changes nothing.
    fn return_reservations(
        &mut self,
        project_id: &str,
        reservations: &[Reservation],
        mode: ReleaseMode,
    ) -> Result<()> {
        let mut counts: BTreeMap<usize, i64> = BTreeMap::new();
        for reservation in reservations {
            let Some(i) = self.items.iter().position(|i| i.id == reservation.item_id) else {
                continue;
            };
            let count = counts.entry(i).or_insert(self.items[i].count);
            if mode == ReleaseMode::Restore {
                *count = add_units(&reservation.item_id, *count, reservation.count)?;
            }
        }

        for (i, count) in counts {
            let item = &mut self.items[i];
            item.remove_membership(project_id);
            item.count = count;
            self.touch(CollectionKind::WarehouseItems);
        }
        Ok(())
    }
}

fn add_units(item_id: &str, units: i64, more: i64) -> Result<i64> {
    units.checked_add(more).ok_or_else(|| out_of_range(item_id))
}

fn out_of_range(item_id: &str) -> Error {
    Error::Validation(format!("unit count of item {item_id} is out of range"))
}

fn ensure_available(item: &Item, amount: i64) -> Result<()> {
    if amount >= item.count {
        return Err(Error::Validation(format!(
            "cannot reserve {amount} of item {}: only {} available",
            item.id, item.count
        )));
    }
    Ok(())
}
