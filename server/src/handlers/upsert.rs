//! Upsert handler - stores records uploaded by clients.

use crate::db;
use crate::error::{AppError, Result};
use inventory_engine::CollectionKind;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

/// Response for a record upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResponse {
    /// Records written
    pub upserted: usize,
    /// Highest version written, usable as a sync token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Store a batch of records for a collection.
pub async fn handle_upsert(
    pool: &PgPool,
    collection: CollectionKind,
    records: Vec<Value>,
) -> Result<UpsertResponse> {
    let keyed = key_records(collection, records)?;
    let latest = db::upsert_records(pool, collection.as_str(), &keyed).await?;

    tracing::info!("Upserted {} {} records", keyed.len(), collection);

    Ok(UpsertResponse {
        upserted: keyed.len(),
        version: latest.map(|v| v.to_string()),
    })
}

/// Pair every record with its id, rejecting the batch if any lacks one.
pub fn key_records(collection: CollectionKind, records: Vec<Value>) -> Result<Vec<(String, Value)>> {
    let id_field = collection.id_field();

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let id = match record.get(id_field) {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(AppError::RejectedRecord {
                        collection,
                        index,
                        reason: format!("no usable {id_field}"),
                    })
                }
            };
            Ok((id, record))
        })
        .collect()
}
