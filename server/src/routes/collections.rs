//! Collection upload routes.

use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use inventory_engine::CollectionKind;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_upsert, UpsertResponse};
use crate::AppState;

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/collections/{collection}/records", put(upsert_handler))
}

/// PUT /collections/{collection}/records - Upsert a batch of records.
async fn upsert_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(records): Json<Vec<Value>>,
) -> Result<Json<UpsertResponse>> {
    let collection: CollectionKind = collection.parse()?;
    let response = handle_upsert(&state.pool, collection, records).await?;
    Ok(Json(response))
}
