//! Error types for the inventory engine.

use crate::{consistency::Inconsistency, CollectionName, RecordId};
use thiserror::Error;

/// All possible errors from the inventory engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(CollectionName),

    #[error("item not found: {0}")]
    ItemNotFound(RecordId),

    #[error("project not found: {0}")]
    ProjectNotFound(RecordId),

    #[error("spot not found: {0}")]
    SpotNotFound(RecordId),

    #[error("record already exists: {0}")]
    RecordAlreadyExists(RecordId),

    #[error("project {project_id} holds no reservation of item {item_id}")]
    ReservationNotFound {
        item_id: RecordId,
        project_id: RecordId,
    },

    #[error("item {item_id} is reserved by {projects} project(s)")]
    ItemReserved { item_id: RecordId, projects: usize },

    // State errors
    #[error("malformed record in {collection}: {reason}")]
    MalformedRecord {
        collection: CollectionName,
        reason: String,
    },

    #[error("inconsistent reservation state: {} problem(s) found", .0.len())]
    TransactionInconsistency(Vec<Inconsistency>),

    // Sync errors
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid sync phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl Error {
    /// Whether this error stems from bad caller input.
    ///
    /// Validation errors are never retried automatically.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::UnknownCollection(_)
                | Error::ItemNotFound(_)
                | Error::ProjectNotFound(_)
                | Error::SpotNotFound(_)
                | Error::RecordAlreadyExists(_)
                | Error::ReservationNotFound { .. }
                | Error::ItemReserved { .. }
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
