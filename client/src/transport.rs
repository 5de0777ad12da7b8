//! Network transport to the sync server.

use crate::config::Config;
use crate::error::SyncFailure;
use inventory_engine::{CollectionKind, PullRequest, PullResponse};
use serde_json::Value;
use std::future::Future;

/// Remote side of a sync cycle.
pub trait Transport: Send + Sync + 'static {
    /// Ask for every record newer than the request's tokens.
    fn pull(
        &self,
        request: &PullRequest,
    ) -> impl Future<Output = Result<PullResponse, SyncFailure>> + Send;

    /// Upload records of one collection; returns how many were stored.
    fn push(
        &self,
        collection: CollectionKind,
        records: Vec<Value>,
    ) -> impl Future<Output = Result<usize, SyncFailure>> + Send;
}

/// Transport speaking the server's JSON API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            session_token: session_token.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.server_url.clone(), config.session_token.clone())
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, SyncFailure> {
        let status = response.status();
        if !status.is_success() {
            return Err(SyncFailure::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| SyncFailure::Transport(e.to_string()))
    }
}

impl Transport for HttpTransport {
    async fn pull(&self, request: &PullRequest) -> Result<PullResponse, SyncFailure> {
        let url = format!("{}/sync", self.base_url);
        tracing::debug!("Pulling from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.session_token)
            .json(request)
            .send()
            .await
            .map_err(|e| SyncFailure::Transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        PullResponse::from_value(body).map_err(SyncFailure::Protocol)
    }

    async fn push(&self, collection: CollectionKind, records: Vec<Value>) -> Result<usize, SyncFailure> {
        let url = format!("{}/collections/{}/records", self.base_url, collection);
        tracing::debug!("Pushing {} records to {}", records.len(), url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.session_token)
            .json(&records)
            .send()
            .await
            .map_err(|e| SyncFailure::Transport(e.to_string()))?;

        let body = Self::read_json(response).await?;
        body.get("upserted")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| {
                SyncFailure::Protocol(inventory_engine::Error::Protocol(
                    "push response lacks upserted count".into(),
                ))
            })
    }
}
