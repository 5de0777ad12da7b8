//! Pull protocol types and the sync cycle state machine.
//!
//! The engine only models the messages and the phases of a cycle; sending
//! requests and persisting results is the caller's job.

use crate::{error::Result, CollectionKind, Error, SyncToken};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Key of the response field carrying the new tokens.
pub const UPDATED_TIMESTAMPS: &str = "updatedTimestamps";

/// Last-sync token per collection.
///
/// A missing entry means the collection was never synced and is requested
/// with a `null` token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState {
    tokens: BTreeMap<CollectionKind, SyncToken>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a collection, `Null` if never synced.
    pub fn token(&self, kind: CollectionKind) -> &SyncToken {
        self.tokens.get(&kind).unwrap_or(&Value::Null)
    }

    pub fn set_token(&mut self, kind: CollectionKind, token: SyncToken) {
        if token.is_null() {
            self.tokens.remove(&kind);
        } else {
            self.tokens.insert(kind, token);
        }
    }

    /// State after applying the tokens a server returned.
    ///
    /// Collections the server did not mention keep their old token.
    pub fn advanced(&self, updated: &BTreeMap<CollectionKind, SyncToken>) -> Self {
        let mut next = self.clone();
        for (kind, token) in updated {
            next.set_token(*kind, token.clone());
        }
        next
    }

    /// Request asking for everything newer than the current tokens.
    pub fn pull_request(&self) -> PullRequest {
        PullRequest {
            last_sync: CollectionKind::ALL
                .into_iter()
                .map(|kind| (kind.as_str().to_string(), self.token(kind).clone()))
                .collect(),
        }
    }

    /// Encode as `{collection, token}` records for a keyed store.
    pub fn to_records(&self) -> Vec<Value> {
        self.tokens
            .iter()
            .map(|(kind, token)| json!({"collection": kind.as_str(), "token": token}))
            .collect()
    }

    /// Decode from `{collection, token}` records, ignoring unknown entries.
    pub fn from_records(records: &[Value]) -> Self {
        let mut state = Self::new();
        for record in records {
            let kind = record
                .get("collection")
                .and_then(Value::as_str)
                .and_then(|name| name.parse::<CollectionKind>().ok());
            if let Some(kind) = kind {
                let token = record.get("token").cloned().unwrap_or(Value::Null);
                state.set_token(kind, token);
            }
        }
        state
    }
}

/// Body of a pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Token per collection name, `null` for a full pull
    pub last_sync: BTreeMap<String, SyncToken>,
}

impl PullRequest {
    /// Token sent for a collection.
    pub fn token(&self, kind: CollectionKind) -> &SyncToken {
        self.last_sync.get(kind.as_str()).unwrap_or(&Value::Null)
    }
}

/// Body of a pull response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Incoming records per collection
    #[serde(flatten)]
    pub batches: BTreeMap<CollectionKind, Vec<Value>>,
    /// New token per collection
    pub updated_timestamps: BTreeMap<CollectionKind, SyncToken>,
}

impl PullResponse {
    /// Parse a response body.
    ///
    /// Collections missing from the body are empty batches. A collection
    /// that is present but not an array is a protocol error, as is a
    /// non-object body. Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            return Err(Error::Protocol("response body is not an object".into()));
        };

        let mut response = PullResponse::default();

        for kind in CollectionKind::ALL {
            match body.remove(kind.as_str()) {
                None | Some(Value::Null) => {}
                Some(Value::Array(records)) => {
                    response.batches.insert(kind, records);
                }
                Some(_) => {
                    return Err(Error::Protocol(format!(
                        "collection {kind} is not an array"
                    )))
                }
            }
        }

        match body.remove(UPDATED_TIMESTAMPS) {
            None | Some(Value::Null) => {}
            Some(Value::Object(tokens)) => {
                for (name, token) in tokens {
                    if let Ok(kind) = name.parse::<CollectionKind>() {
                        response.updated_timestamps.insert(kind, token);
                    }
                }
            }
            Some(_) => {
                return Err(Error::Protocol(format!(
                    "{UPDATED_TIMESTAMPS} is not an object"
                )))
            }
        }

        Ok(response)
    }

    /// Parse a response from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let value = serde_json::from_str(json).map_err(|e| Error::Protocol(e.to_string()))?;
        Self::from_value(value)
    }

    /// Take the batch for a collection, empty if none was sent.
    pub fn take_batch(&mut self, kind: CollectionKind) -> Vec<Value> {
        self.batches.remove(&kind).unwrap_or_default()
    }

    /// Total records across all batches.
    pub fn record_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }
}

/// Phase of the sync coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncPhase {
    #[default]
    Idle,
    Requesting,
    Merging,
    Failed,
}

impl SyncPhase {
    /// Whether a cycle is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncPhase::Requesting | SyncPhase::Merging)
    }

    /// Move to `next`, rejecting transitions the cycle does not allow.
    ///
    /// ```text
    /// IDLE | FAILED -> REQUESTING -> MERGING -> IDLE
    ///                      |            |
    ///                      +-> FAILED <-+
    /// ```
    pub fn transition(self, next: SyncPhase) -> Result<SyncPhase> {
        use SyncPhase::*;
        match (self, next) {
            (Idle | Failed, Requesting)
            | (Requesting, Merging)
            | (Requesting | Merging, Failed)
            | (Merging, Idle) => Ok(next),
            _ => Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "IDLE",
            SyncPhase::Requesting => "REQUESTING",
            SyncPhase::Merging => "MERGING",
            SyncPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_lists_every_collection() {
        let mut state = SyncState::new();
        state.set_token(CollectionKind::Projects, json!("1706745600000"));

        let request = serde_json::to_value(state.pull_request()).unwrap();

        assert_eq!(request["lastSync"]["projects"], json!("1706745600000"));
        assert_eq!(request["lastSync"]["warehouseItems"], Value::Null);
        assert_eq!(request["lastSync"].as_object().unwrap().len(), 7);
    }

    #[test]
    fn advanced_keeps_unmentioned_tokens() {
        let mut state = SyncState::new();
        state.set_token(CollectionKind::Projects, json!(10));
        state.set_token(CollectionKind::Spots, json!(11));

        let updated = BTreeMap::from([(CollectionKind::Projects, json!(20))]);
        let next = state.advanced(&updated);

        assert_eq!(next.token(CollectionKind::Projects), &json!(20));
        assert_eq!(next.token(CollectionKind::Spots), &json!(11));
        assert_eq!(state.token(CollectionKind::Projects), &json!(10));
    }

    #[test]
    fn state_records_roundtrip() {
        let mut state = SyncState::new();
        state.set_token(CollectionKind::History, json!("abc"));
        state.set_token(CollectionKind::Profile, json!(5));

        let mut records = state.to_records();
        records.push(json!({"collection": "orders", "token": 1}));

        assert_eq!(SyncState::from_records(&records), state);
    }

    #[test]
    fn parse_response() {
        let body = json!({
            "warehouseItems": [{"id": "i1"}],
            "projects": [],
            "spots": null,
            "somethingElse": 42,
            "updatedTimestamps": {"warehouseItems": 100, "orders": 3},
        });

        let mut response = PullResponse::from_value(body).unwrap();

        assert_eq!(response.record_count(), 1);
        assert_eq!(response.take_batch(CollectionKind::WarehouseItems).len(), 1);
        assert!(response.take_batch(CollectionKind::Spots).is_empty());
        assert_eq!(
            response.updated_timestamps,
            BTreeMap::from([(CollectionKind::WarehouseItems, json!(100))])
        );
    }

    #[test]
    fn non_array_collection_is_rejected() {
        let err = PullResponse::from_value(json!({"projects": {"id": "p1"}})).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        assert!(PullResponse::from_json("not json").is_err());
        assert!(PullResponse::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn response_serializes_flat() {
        let response = PullResponse {
            batches: BTreeMap::from([(CollectionKind::Spots, vec![json!({"spotId": "s1"})])]),
            updated_timestamps: BTreeMap::from([(CollectionKind::Spots, json!("7"))]),
        };

        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["spots"], json!([{"spotId": "s1"}]));
        assert_eq!(value["updatedTimestamps"]["spots"], json!("7"));

        let parsed = PullResponse::from_value(value).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn phase_transitions() {
        use SyncPhase::*;

        assert_eq!(Idle.transition(Requesting), Ok(Requesting));
        assert_eq!(Requesting.transition(Merging), Ok(Merging));
        assert_eq!(Merging.transition(Idle), Ok(Idle));
        assert_eq!(Requesting.transition(Failed), Ok(Failed));
        assert_eq!(Failed.transition(Requesting), Ok(Requesting));

        assert!(Idle.transition(Merging).is_err());
        assert!(Failed.transition(Idle).is_err());
        assert!(Merging.transition(Requesting).is_err());
    }

    #[test]
    fn phase_serializes_upper_case() {
        assert_eq!(serde_json::to_value(SyncPhase::Requesting).unwrap(), json!("REQUESTING"));
        assert_eq!(SyncPhase::Failed.to_string(), "FAILED");
    }
}
