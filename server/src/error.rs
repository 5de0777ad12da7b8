//! Errors returned by the sync endpoints.
//!
//! Each variant maps to one status code and a stable `code` string in the
//! JSON body, so device clients can tell a bad token from a rejected batch
//! without parsing messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inventory_engine::CollectionKind;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid sync token for {collection}: {token}")]
    InvalidToken {
        collection: CollectionKind,
        token: String,
    },

    /// One record of an upload is unusable; nothing of the batch was stored.
    #[error("record {index} of {collection} rejected: {reason}")]
    RejectedRecord {
        collection: CollectionKind,
        index: usize,
        reason: String,
    },

    #[error(transparent)]
    Engine(inventory_engine::Error),
}

impl From<inventory_engine::Error> for AppError {
    fn from(err: inventory_engine::Error) -> Self {
        match err {
            inventory_engine::Error::UnknownCollection(name) => AppError::UnknownCollection(name),
            other => AppError::Engine(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UnknownCollection(_) => StatusCode::NOT_FOUND,
            AppError::InvalidToken { .. } => StatusCode::BAD_REQUEST,
            AppError::RejectedRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Engine(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::UnknownCollection(_) => "unknown_collection",
            AppError::InvalidToken { .. } => "invalid_token",
            AppError::RejectedRecord { .. } => "rejected_record",
            AppError::Engine(_) => "invalid_request",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "database unavailable".to_string()
            }
            other => {
                tracing::warn!("Rejected request: {}", other);
                other.to_string()
            }
        };

        let body = ErrorBody {
            code: self.code(),
            error: message,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
