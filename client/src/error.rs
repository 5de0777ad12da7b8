//! Error types for the inventory client.

use crate::config::ConfigError;
use crate::store::StoreError;
use std::time::Duration;

/// Why a sync cycle was aborted.
///
/// A failed cycle never advances the stored sync tokens.
#[derive(Debug, thiserror::Error)]
pub enum SyncFailure {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid response: {0}")]
    Protocol(#[source] inventory_engine::Error),

    #[error("Persisting sync results failed: {0}")]
    Persist(String),
}

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] inventory_engine::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncFailure),

    #[error("A sync cycle is already in progress")]
    SyncInProgress,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the error stems from bad caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Engine(e) if e.is_validation())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
