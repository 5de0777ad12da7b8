//! Record types for the inventory collections.
//!
//! Records travel as JSON. The typed views below keep any field they do not
//! model in `extra`, so decoding and re-encoding a record never drops data
//! written by the server or another screen.

use crate::{error::Result, CategoryScope, CollectionKind, Error, RecordId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// A typed record stored in one of the engine's collections.
pub trait Record: Serialize + DeserializeOwned {
    /// Collection the record lives in.
    const COLLECTION: CollectionKind;

    /// Identifier of the record.
    fn id(&self) -> &str;

    /// Collection this particular record is written to.
    fn collection(&self) -> CollectionKind {
        Self::COLLECTION
    }

    /// Decode a record from its JSON form.
    fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::MalformedRecord {
            collection: Self::COLLECTION.as_str().to_string(),
            reason: e.to_string(),
        })
    }

    /// Encode the record into its JSON form.
    fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| Error::MalformedRecord {
            collection: self.collection().as_str().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Decode a whole collection list.
pub fn decode_all<R: Record>(values: Vec<Value>) -> Result<Vec<R>> {
    values.into_iter().map(R::from_value).collect()
}

/// Encode a whole collection list.
pub fn encode_all<R: Record>(records: &[R]) -> Result<Vec<Value>> {
    records.iter().map(Record::to_value).collect()
}

/// A warehouse item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Units still available, i.e. not reserved by any project.
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub photos: Vec<String>,
    /// Ids of projects holding a reservation of this item.
    ///
    /// This is an index only. Quantities live in [`Project::reserved`].
    #[serde(default)]
    pub reserved: Vec<RecordId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>, count: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: None,
            count,
            photos: Vec::new(),
            reserved: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Whether the index lists `project_id`.
    pub fn is_reserved_by(&self, project_id: &str) -> bool {
        self.reserved.iter().any(|p| p == project_id)
    }

    pub(crate) fn add_membership(&mut self, project_id: &str) {
        if !self.is_reserved_by(project_id) {
            self.reserved.push(project_id.to_string());
        }
    }

    pub(crate) fn remove_membership(&mut self, project_id: &str) -> bool {
        let before = self.reserved.len();
        self.reserved.retain(|p| p != project_id);
        before != self.reserved.len()
    }
}

impl Record for Item {
    const COLLECTION: CollectionKind = CollectionKind::WarehouseItems;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Quantity of one item earmarked for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub item_id: RecordId,
    pub count: i64,
}

impl Reservation {
    pub fn new(item_id: impl Into<RecordId>, count: i64) -> Self {
        Self {
            item_id: item_id.into(),
            count,
        }
    }
}

/// A project consuming warehouse stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    /// Authoritative reservation quantities, at most one entry per item.
    #[serde(default)]
    pub reserved: Vec<Reservation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: None,
            finished: false,
            photos: Vec::new(),
            date_created: None,
            reserved: Vec::new(),
            extra: Map::new(),
        }
    }

    /// The reservation of `item_id`, if any.
    pub fn reservation(&self, item_id: &str) -> Option<&Reservation> {
        self.reserved.iter().find(|r| r.item_id == item_id)
    }

    pub(crate) fn reservation_mut(&mut self, item_id: &str) -> Option<&mut Reservation> {
        self.reserved.iter_mut().find(|r| r.item_id == item_id)
    }

    /// Remove the reservation of `item_id`, returning it.
    pub(crate) fn take_reservation(&mut self, item_id: &str) -> Option<Reservation> {
        let index = self.reserved.iter().position(|r| r.item_id == item_id)?;
        Some(self.reserved.remove(index))
    }
}

impl Record for Project {
    const COLLECTION: CollectionKind = CollectionKind::Projects;

    fn id(&self) -> &str {
        &self.id
    }
}

/// A physical storage spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub spot_id: RecordId,
    #[serde(default)]
    pub description: String,
    /// Items stored at this spot.
    #[serde(default)]
    pub reserved_items: Vec<RecordId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Spot {
    pub fn new(spot_id: impl Into<RecordId>, description: impl Into<String>) -> Self {
        Self {
            spot_id: spot_id.into(),
            description: description.into(),
            reserved_items: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn holds(&self, item_id: &str) -> bool {
        self.reserved_items.iter().any(|i| i == item_id)
    }
}

impl Record for Spot {
    const COLLECTION: CollectionKind = CollectionKind::Spots;

    fn id(&self) -> &str {
        &self.spot_id
    }
}

/// A category name in the warehouse or project namespace.
///
/// Both namespaces share one record shape. The scope is not stored in the
/// record; it follows from the collection the record was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(skip)]
    pub scope: CategoryScope,
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn new(scope: CategoryScope, id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            scope,
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// Decode a category read from the collection of `scope`.
    pub fn decode(scope: CategoryScope, value: Value) -> Result<Self> {
        let mut category = Self::from_value(value).map_err(|e| match e {
            Error::MalformedRecord { reason, .. } => Error::MalformedRecord {
                collection: scope.collection().as_str().to_string(),
                reason,
            },
            other => other,
        })?;
        category.scope = scope;
        Ok(category)
    }
}

impl Record for Category {
    const COLLECTION: CollectionKind = CollectionKind::WarehouseCategories;

    fn id(&self) -> &str {
        &self.id
    }

    fn collection(&self) -> CollectionKind {
        self.scope.collection()
    }
}
