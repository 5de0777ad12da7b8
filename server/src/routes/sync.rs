//! Sync endpoint routes.

use axum::{extract::State, routing::post, Json, Router};
use inventory_engine::{PullRequest, PullResponse};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::handle_pull;
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sync", post(pull_handler))
}

/// POST /sync - Pull records newer than the client's tokens.
async fn pull_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<PullRequest>,
) -> Result<Json<PullResponse>> {
    if auth.is_anonymous() {
        tracing::debug!("Anonymous pull");
    }
    let response = handle_pull(&state.pool, request).await?;
    Ok(Json(response))
}
