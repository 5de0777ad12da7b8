//! Database operations for the records table.
//!
//! Every write stamps the row with the next value of a global sequence.
//! A client's sync token for a collection is the highest version it has
//! seen there.
//!
//! Writers hold a transaction-scoped advisory lock while they draw versions
//! and commit. Versions therefore become visible in the order they were
//! drawn, and a reader never sees a version above one still uncommitted.

use serde_json::Value;
use sqlx::{PgPool, Row};

/// Advisory lock key shared by every transaction that draws record versions.
pub const VERSION_LOCK_KEY: i64 = 4_211_001;

/// A stored record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    pub payload: Value,
    pub version: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            payload: row.try_get("payload")?,
            version: row.try_get("version")?,
        })
    }
}

/// Upsert a batch of records of one collection in a single transaction.
///
/// Fields of an existing payload that the incoming record omits are kept;
/// every field it carries, arrays included, replaces the stored one.
/// Returns the highest version written.
pub async fn upsert_records(
    pool: &PgPool,
    collection: &str,
    records: &[(String, Value)],
) -> Result<Option<i64>, sqlx::Error> {
    if records.is_empty() {
        return Ok(None);
    }

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(VERSION_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    let mut latest = None;

    for (record_id, payload) in records {
        let version: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO records (collection, record_id, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, record_id) DO UPDATE SET
                payload = records.payload || EXCLUDED.payload,
                version = nextval('record_version_seq'),
                updated_at = now()
            RETURNING version
            "#,
        )
        .bind(collection)
        .bind(record_id)
        .bind(payload)
        .fetch_one(&mut *tx)
        .await?;

        latest = latest.max(Some(version));
    }

    tx.commit().await?;
    Ok(latest)
}

/// Records of a collection written after `since`, oldest first.
///
/// `None` returns the whole collection.
pub async fn get_records_since(
    pool: &PgPool,
    collection: &str,
    since: Option<i64>,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT payload, version
        FROM records
        WHERE collection = $1 AND ($2::BIGINT IS NULL OR version > $2)
        ORDER BY version ASC
        "#,
    )
    .bind(collection)
    .bind(since)
    .fetch_all(pool)
    .await
}
