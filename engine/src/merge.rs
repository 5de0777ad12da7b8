//! Record merge engine.
//!
//! Folds a batch of incoming records for one collection into the existing
//! list. This is how pulled server state lands locally.
//!
//! # Rules
//!
//! 1. Records without a usable id are skipped and reported; the batch goes on.
//!    In the ledger collections a record whose merged form does not decode as
//!    its typed record is skipped the same way, leaving any stored copy as is.
//! 2. New ids are appended after normalization: absent `reserved`/`photos`
//!    become empty arrays and malformed array entries are dropped.
//! 3. Known ids take every incoming field (last writer wins), except
//!    `reserved` and `photos`, which are replaced wholesale by the incoming
//!    array, including when that array is empty.
//!
//! Merging the same batch twice yields the same list.

use crate::collection::{CollectionKind, ReservedRule};
use crate::record::{Item, Project, Record, Spot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

const RESERVED: &str = "reserved";
const PHOTOS: &str = "photos";

/// Why a record was left out of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The record is not a JSON object.
    NotAnObject,
    /// The id field is missing, null or empty.
    MissingId,
    /// The record does not decode as its collection's typed record.
    Malformed(String),
}

/// A malformed record encountered mid-batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSkip {
    /// Position of the record in the incoming batch
    pub index: usize,
    pub reason: SkipReason,
}

/// Summary of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Records appended because their id was new
    pub inserted: usize,
    /// Records whose id already existed
    pub updated: usize,
    /// Records skipped for being malformed
    pub skipped: Vec<MergeSkip>,
    /// Array entries dropped by validation
    pub dropped_entries: usize,
}

/// Result of a merge: the new list and what happened.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<Value>,
    pub report: MergeReport,
}

/// Merge `incoming` into `existing` using the collection's id field.
pub fn merge(collection: CollectionKind, existing: Vec<Value>, incoming: Vec<Value>) -> MergeOutcome {
    Merger::new(collection).merge(existing, incoming)
}

type Conformance = fn(&Value) -> Result<(), String>;

/// Configurable merge of one collection.
#[derive(Debug, Clone)]
pub struct Merger {
    rule: ReservedRule,
    id_field: String,
    conforms: Option<Conformance>,
}

impl Merger {
    /// Create a merger for a collection.
    pub fn new(collection: CollectionKind) -> Self {
        Self {
            rule: collection.reserved_rule(),
            id_field: collection.id_field().to_string(),
            conforms: match collection {
                CollectionKind::WarehouseItems => Some(conforms::<Item>),
                CollectionKind::Projects => Some(conforms::<Project>),
                CollectionKind::Spots => Some(conforms::<Spot>),
                _ => None,
            },
        }
    }

    /// Override the identifying field.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Run the merge.
    pub fn merge(&self, existing: Vec<Value>, incoming: Vec<Value>) -> MergeOutcome {
        let mut report = MergeReport::default();
        let mut records = existing;

        let mut positions: HashMap<String, usize> = HashMap::new();
        for (pos, record) in records.iter().enumerate() {
            if let Some(id) = self.record_id(record) {
                positions.entry(id).or_insert(pos);
            }
        }

        for (index, record) in incoming.into_iter().enumerate() {
            let Value::Object(fields) = record else {
                report.skipped.push(MergeSkip {
                    index,
                    reason: SkipReason::NotAnObject,
                });
                continue;
            };

            let Some(id) = id_of(&fields, &self.id_field) else {
                report.skipped.push(MergeSkip {
                    index,
                    reason: SkipReason::MissingId,
                });
                continue;
            };

            let known = positions.get(&id).copied();
            let mut dropped = 0;
            let candidate = match known {
                Some(pos) => {
                    let mut merged = records[pos].clone();
                    self.update(&mut merged, fields, &mut dropped);
                    merged
                }
                None => Value::Object(self.normalize(fields, &mut dropped)),
            };

            if let Some(Err(reason)) = self.conforms.map(|check| check(&candidate)) {
                report.skipped.push(MergeSkip {
                    index,
                    reason: SkipReason::Malformed(reason),
                });
                continue;
            }
            report.dropped_entries += dropped;

            match known {
                Some(pos) => {
                    records[pos] = candidate;
                    report.updated += 1;
                }
                None => {
                    positions.insert(id, records.len());
                    records.push(candidate);
                    report.inserted += 1;
                }
            }
        }

        MergeOutcome { records, report }
    }

    fn record_id(&self, record: &Value) -> Option<String> {
        record.as_object().and_then(|o| id_of(o, &self.id_field))
    }

    fn normalize(&self, mut fields: Map<String, Value>, dropped: &mut usize) -> Map<String, Value> {
        let reserved = fields.remove(RESERVED).unwrap_or(Value::Null);
        let photos = fields.remove(PHOTOS).unwrap_or(Value::Null);
        fields.insert(RESERVED.into(), self.clean_reserved(reserved, dropped));
        fields.insert(PHOTOS.into(), clean_photos(photos, dropped));
        fields
    }

    fn update(&self, existing: &mut Value, incoming: Map<String, Value>, dropped: &mut usize) {
        let Value::Object(target) = existing else {
            *existing = Value::Object(self.normalize(incoming, dropped));
            return;
        };

        for (key, value) in incoming {
            let value = match key.as_str() {
                RESERVED => self.clean_reserved(value, dropped),
                PHOTOS => clean_photos(value, dropped),
                _ => value,
            };
            target.insert(key, value);
        }

        for key in [RESERVED, PHOTOS] {
            target
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()));
        }
    }

    fn clean_reserved(&self, value: Value, dropped: &mut usize) -> Value {
        let entries = match value {
            Value::Array(entries) => entries,
            Value::Null => Vec::new(),
            _ => {
                *dropped += 1;
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            let cleaned = match self.rule {
                ReservedRule::Authoritative => authoritative_entry(entry),
                ReservedRule::Index => index_entry(entry),
                ReservedRule::Generic => generic_entry(entry),
            };
            match cleaned {
                Some((key, entry)) if key.as_ref().map_or(true, |k| seen.insert(k.clone())) => {
                    kept.push(entry)
                }
                _ => *dropped += 1,
            }
        }
        Value::Array(kept)
    }
}

fn conforms<R: Record>(value: &Value) -> Result<(), String> {
    R::from_value(value.clone()).map(drop).map_err(|e| e.to_string())
}

fn id_of(fields: &Map<String, Value>, id_field: &str) -> Option<String> {
    match fields.get(id_field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str<'a>(entry: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn has_count(entry: &Map<String, Value>) -> bool {
    entry.get("count").is_some_and(|c| !c.is_null())
}

/// `{itemId, count}` with a positive integer count; one entry per item.
fn authoritative_entry(entry: Value) -> Option<(Option<String>, Value)> {
    let obj = entry.as_object()?;
    let item_id = non_empty_str(obj, "itemId")?.to_string();
    let count = obj.get("count")?.as_i64()?;
    if count < 1 {
        return None;
    }
    Some((Some(item_id), entry))
}

/// Project id string, or the legacy `{itemId, projectId, count}` object
/// reduced to its project id.
fn index_entry(entry: Value) -> Option<(Option<String>, Value)> {
    let project_id = match &entry {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Object(obj) => {
            non_empty_str(obj, "itemId")?;
            if !has_count(obj) {
                return None;
            }
            non_empty_str(obj, "projectId")?.to_string()
        }
        _ => return None,
    };
    Some((Some(project_id.clone()), Value::String(project_id)))
}

fn generic_entry(entry: Value) -> Option<(Option<String>, Value)> {
    let obj = entry.as_object()?;
    let named = non_empty_str(obj, "itemId").is_some() || non_empty_str(obj, "projectId").is_some();
    if !named || !has_count(obj) {
        return None;
    }
    Some((None, entry))
}

fn clean_photos(value: Value, dropped: &mut usize) -> Value {
    match value {
        Value::Array(entries) => {
            let total = entries.len();
            let kept: Vec<Value> = entries
                .into_iter()
                .filter(|p| p.as_str().is_some_and(|s| !s.is_empty()))
                .collect();
            *dropped += total - kept.len();
            Value::Array(kept)
        }
        Value::Null => Value::Array(Vec::new()),
        _ => {
            *dropped += 1;
            Value::Array(Vec::new())
        }
    }
}
