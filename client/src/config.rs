//! Configuration management for the client.

use std::env;
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the sync server
    pub server_url: String,
    /// Opaque session credential sent as a bearer token
    pub session_token: String,
    /// SQLite connection URL for the local store
    pub database_url: String,
    /// Timeout applied to each network request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = lookup("INVENTORY_SERVER_URL")
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let session_token = lookup("INVENTORY_SESSION_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingSessionToken)?;

        let database_url =
            lookup("INVENTORY_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let request_timeout = match lookup("INVENTORY_REQUEST_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        Ok(Self {
            server_url,
            session_token,
            database_url,
            request_timeout: Duration::from_millis(request_timeout),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("INVENTORY_SESSION_TOKEN environment variable is required")]
    MissingSessionToken,

    #[error("Invalid INVENTORY_REQUEST_TIMEOUT_MS value: {0}")]
    InvalidTimeout(String),
}
