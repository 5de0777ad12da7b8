//! Spot assignment index.
//!
//! Spots list the items stored at them. Membership carries no quantity.

use crate::{error::Result, CollectionKind, Inventory, RecordId};

impl Inventory {
    /// Put an item at a spot. Returns `false` if it was already there.
    pub fn assign(&mut self, spot_id: &str, item_id: &str) -> Result<bool> {
        let s = self.spot_index(spot_id)?;
        self.item_index(item_id)?;

        let spot = &mut self.spots[s];
        if spot.holds(item_id) {
            return Ok(false);
        }
        spot.reserved_items.push(item_id.to_string());
        self.touch(CollectionKind::Spots);
        Ok(true)
    }

    /// Take an item off a spot. Returns `false` if it was not there.
    pub fn unassign(&mut self, spot_id: &str, item_id: &str) -> Result<bool> {
        let s = self.spot_index(spot_id)?;

        let spot = &mut self.spots[s];
        let before = spot.reserved_items.len();
        spot.reserved_items.retain(|i| i != item_id);
        if spot.reserved_items.len() == before {
            return Ok(false);
        }
        self.touch(CollectionKind::Spots);
        Ok(true)
    }

    /// Ids of the spots holding an item.
    pub fn spots_for_item(&self, item_id: &str) -> Vec<RecordId> {
        self.spots
            .iter()
            .filter(|s| s.holds(item_id))
            .map(|s| s.spot_id.clone())
            .collect()
    }

    /// Unassign an item from every spot, returning how many were touched.
    pub(crate) fn unassign_everywhere(&mut self, item_id: &str) -> usize {
        let mut touched = 0;
        for spot_id in self.spots_for_item(item_id) {
            if let Ok(true) = self.unassign(&spot_id, item_id) {
                touched += 1;
            }
        }
        touched
    }
}
