//! # Inventory Engine
//!
//! Deterministic core of an offline-first warehouse inventory.
//!
//! This crate keeps denormalized inventory and reservation records
//! consistent across independently updated collections and folds pulled
//! server state into local state. It performs no IO: persistence and
//! networking belong to the caller.
//!
//! ## Collections
//!
//! Records live in named JSON lists ([`CollectionKind`]): warehouse items,
//! projects, spots, categories, history and the user profile.
//!
//! ## Reservations
//!
//! A [`Project`]'s `reserved` list is the only source of reserved
//! quantities. An [`Item`]'s `reserved` list is a rebuildable index of the
//! projects holding it, and its `count` is the number of units still
//! available. The ledger operations on [`Inventory`] keep both sides in
//! step:
//! - [`Inventory::reserve`] - move units from an item to a project
//! - [`Inventory::release`] - drop a reservation, consuming or restoring units
//! - [`Inventory::adjust_count`] - grow or shrink a reservation
//! - [`Inventory::delete_item`] - delete with refusal or cascade
//!
//! ## Merging
//!
//! [`merge()`] folds a server batch into a local list: scalars are last
//! writer wins, `reserved` and `photos` arrays are replaced wholesale.
//!
//! ## Quick Start
//!
//! ```rust
//! use inventory_engine::{Inventory, Item, Project, ReleaseMode};
//!
//! let mut inventory = Inventory::new();
//! inventory.insert_item(Item::new("i1", "Cordless drill", 10)).unwrap();
//! inventory.insert_project(Project::new("p1", "Deck")).unwrap();
//!
//! inventory.reserve("i1", "p1", 3).unwrap();
//! assert_eq!(inventory.item("i1").unwrap().count, 7);
//!
//! inventory.release("i1", "p1", ReleaseMode::Restore).unwrap();
//! assert_eq!(inventory.item("i1").unwrap().count, 10);
//! ```

pub mod collection;
pub mod consistency;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod record;
pub mod snapshot;
pub mod spots;
pub mod store;
pub mod sync;

// Re-export main types at crate root
pub use collection::{CategoryScope, CollectionKind, ReservedRule};
pub use consistency::{Inconsistency, RepairReport};
pub use error::Error;
pub use ledger::{DeletePolicy, ItemReservation, ReleaseMode};
pub use merge::{merge, MergeOutcome, MergeReport, MergeSkip, Merger, SkipReason};
pub use record::{Category, Item, Project, Record, Reservation, Spot};
pub use snapshot::{InventorySnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{Inventory, PERSIST_ORDER};
pub use sync::{PullRequest, PullResponse, SyncPhase, SyncState};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
pub type SyncToken = serde_json::Value;
