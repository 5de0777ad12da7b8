//! Catalogue of the synced collections.
//!
//! Every collection is persisted as one list of JSON records under its
//! wire name. The catalogue fixes the name, the identifying field and the
//! rule applied to `reserved` entries during merges.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A collection known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    Profile,
    WarehouseItems,
    Projects,
    History,
    WarehouseCategories,
    ProjectCategories,
    Spots,
}

/// How entries of a `reserved` array are validated when merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedRule {
    /// Project-side authority: `{itemId, count}` with a positive count.
    Authoritative,
    /// Item-side index: project ids.
    Index,
    /// Any entry naming an item or project with a defined count.
    Generic,
}

impl CollectionKind {
    /// All collections, in the order they are requested and merged.
    pub const ALL: [CollectionKind; 7] = [
        CollectionKind::Profile,
        CollectionKind::WarehouseItems,
        CollectionKind::Projects,
        CollectionKind::History,
        CollectionKind::WarehouseCategories,
        CollectionKind::ProjectCategories,
        CollectionKind::Spots,
    ];

    /// Wire and storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Profile => "profile",
            CollectionKind::WarehouseItems => "warehouseItems",
            CollectionKind::Projects => "projects",
            CollectionKind::History => "history",
            CollectionKind::WarehouseCategories => "warehouseCategories",
            CollectionKind::ProjectCategories => "projectCategories",
            CollectionKind::Spots => "spots",
        }
    }

    /// Name of the field that identifies a record.
    pub fn id_field(&self) -> &'static str {
        match self {
            CollectionKind::Spots => "spotId",
            _ => "id",
        }
    }

    pub fn reserved_rule(&self) -> ReservedRule {
        match self {
            CollectionKind::Projects => ReservedRule::Authoritative,
            CollectionKind::WarehouseItems => ReservedRule::Index,
            _ => ReservedRule::Generic,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        CollectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))
    }
}

/// Namespace a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryScope {
    #[default]
    Warehouse,
    Project,
}

impl CategoryScope {
    /// Collection holding categories of this scope.
    pub fn collection(&self) -> CollectionKind {
        match self {
            CategoryScope::Warehouse => CollectionKind::WarehouseCategories,
            CategoryScope::Project => CollectionKind::ProjectCategories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for kind in CollectionKind::ALL {
            assert_eq!(kind.as_str().parse::<CollectionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name() {
        let err = "orders".parse::<CollectionKind>().unwrap_err();
        assert_eq!(err, Error::UnknownCollection("orders".into()));
    }

    #[test]
    fn spots_use_spot_id() {
        assert_eq!(CollectionKind::Spots.id_field(), "spotId");
        assert_eq!(CollectionKind::WarehouseItems.id_field(), "id");
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&CollectionKind::WarehouseCategories).unwrap();
        assert_eq!(json, "\"warehouseCategories\"");
    }
}
