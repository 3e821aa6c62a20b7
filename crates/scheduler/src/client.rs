//! RPC client for the worker pool.

use std::time::Duration;

use async_trait::async_trait;
use graphsplit_core::config::WorkerEndpointConfig;
use graphsplit_core::protocol::{TaskRequest, TaskResponse};
use tracing::debug;

use crate::error::ClientError;

/// Send one request to a worker and return its answer.
///
/// Implementations are stateless and never retry; the scheduler loops own
/// the retry policy.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn send(&self, request: &TaskRequest) -> Result<TaskResponse, ClientError>;
}

/// JSON-over-HTTP client with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpWorkerClient {
    http: reqwest::Client,
    url: String,
}

impl HttpWorkerClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { http, url: url.into() })
    }

    pub fn from_config(config: &WorkerEndpointConfig) -> Result<Self, ClientError> {
        Self::new(config.url.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn send(&self, request: &TaskRequest) -> Result<TaskResponse, ClientError> {
        let resp = self.http.post(&self.url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        let response: TaskResponse =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        if response.id != request.id {
            return Err(ClientError::MismatchedId {
                expected: request.id.clone(),
                got: response.id,
            });
        }

        debug!(task_id = %request.id, status = ?response.status, "worker: response received");
        Ok(response)
    }
}
