//! SQLite-backed store.

use super::{decode_list, KeyedStore, StoreError};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Store persisting each list as one row in a local SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and run
    /// migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl KeyedStore for SqliteStore {
    async fn get(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT records FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((raw,)) => decode_list(name, &raw),
            None => Ok(Vec::new()),
        }
    }

    async fn set(&self, name: &str, records: Vec<Value>) -> Result<(), StoreError> {
        let raw = Value::Array(records).to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO collections (name, records, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                records = excluded.records,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(&raw)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
