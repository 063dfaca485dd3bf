//! Boundary with the documentation backend.
//!
//! The core never talks HTTP directly: it consumes the [`DocService`]
//! trait, which [`HttpDocService`] implements over `reqwest`. Tests swap in
//! scripted implementations to control timing and failures.
//!
//! # Endpoints
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | Retrieval + generation | `POST` | `/search/rag` |
//! | Generation only | `POST` | `/search/raw` |
//! | Retrieval only | `POST` | `/search` |
//! | File catalog | `GET` | `/files` |
//! | Repository ingestion | `POST` | `/ingest/git` |
//! | File ingestion | `POST` | `/ingest/upload` (multipart `file`) |
//! | Health | `GET` | `/health` |
//!
//! # Error Contract
//!
//! Error bodies carry a human-readable `detail`:
//!
//! ```json
//! { "detail": "Query cannot be empty" }
//! ```
//!
//! Request-validation failures carry a list instead; the first entry's
//! `msg` is used. When no detail can be found, callers substitute a fixed
//! per-operation fallback via [`ServiceError::display_message`].

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::models::{
    AugmentedResult, BaselineOutcome, BaselineResult, HealthStatus, IndexedFile, RetrievalResult,
};
use crate::params::{Provider, SearchParameters};

/// Failure of a single external call. Always channel-local; never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    #[error("service rejected the request: {detail}")]
    Rejected { detail: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Human-readable detail supplied by the service, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::Status { detail, .. } => detail.as_deref(),
            ServiceError::Rejected { detail } => Some(detail),
            _ => None,
        }
    }

    /// Reduce the error to the single string shown to the user.
    pub fn display_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

/// Pull a displayable `detail` out of an error body.
pub fn extract_detail(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = json.get("detail")?;
    let text = match detail {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items.first()?.get("msg")?.as_str()?.to_string(),
        _ => return None,
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Bound `call` by `limit`; elapsing maps to [`ServiceError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit)),
    }
}

/// Retrieval + generation request. Built from a parameter snapshot so later
/// edits never reach a call already in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AugmentedRequest {
    pub query: String,
    pub top_k: u32,
    pub min_similarity: f64,
    pub provider: Provider,
}

impl AugmentedRequest {
    pub fn new(query: &str, params: &SearchParameters) -> Self {
        Self {
            query: query.to_string(),
            top_k: params.top_k(),
            min_similarity: params.min_similarity(),
            provider: params.provider(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineRequest {
    pub query: String,
    pub provider: Provider,
}

/// Contract consumed by the orchestration layer.
#[async_trait]
pub trait DocService: Send + Sync {
    /// Retrieve relevant chunks and generate a grounded answer.
    async fn search_augmented(
        &self,
        request: &AugmentedRequest,
    ) -> Result<AugmentedResult, ServiceError>;

    /// Generate an answer with no retrieved context.
    async fn search_baseline(
        &self,
        request: &BaselineRequest,
    ) -> Result<BaselineResult, ServiceError>;

    /// Flat list of indexed files, in service order.
    async fn list_files(&self) -> Result<Vec<IndexedFile>, ServiceError>;

    /// Queue a repository for ingestion. Acknowledgement only.
    async fn ingest_repository(&self, repo_url: &str, branch: &str) -> Result<(), ServiceError>;

    /// Upload a file for ingestion. Acknowledgement only.
    async fn ingest_file(&self, name: &str, content: Vec<u8>) -> Result<(), ServiceError>;
}

// ============ HTTP implementation ============

#[derive(Deserialize)]
struct BaselineWire {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    latency_ms: Option<f64>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct FilesWire {
    #[serde(default)]
    files: Vec<IndexedFile>,
}

#[derive(Serialize)]
struct RetrievalRequest<'a> {
    query: &'a str,
    top_k: u32,
    min_similarity: f64,
}

#[derive(Serialize)]
struct GitIngestRequest<'a> {
    repo_url: &'a str,
    branch: &'a str,
}

/// [`DocService`] over the backend's JSON HTTP API.
pub struct HttpDocService {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDocService {
    pub fn new(config: &ServiceConfig) -> anyhow::Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::Transport(err.to_string())
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, ServiceError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport(e))?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }
        Ok(body)
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let body = self.read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ServiceError> {
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport(e))
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ServiceError> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport(e))
    }

    /// Retrieval without generation.
    pub async fn retrieve(
        &self,
        query: &str,
        params: &SearchParameters,
    ) -> Result<RetrievalResult, ServiceError> {
        let request = RetrievalRequest {
            query,
            top_k: params.top_k(),
            min_similarity: params.min_similarity(),
        };
        let response = self.post_json("/search", &request).await?;
        self.decode(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ServiceError> {
        let response = self.get("/health").await?;
        self.decode(response).await
    }
}

#[async_trait]
impl DocService for HttpDocService {
    async fn search_augmented(
        &self,
        request: &AugmentedRequest,
    ) -> Result<AugmentedResult, ServiceError> {
        let response = self.post_json("/search/rag", request).await?;
        let result: AugmentedResult = self.decode(response).await?;
        Ok(result.ranked())
    }

    async fn search_baseline(
        &self,
        request: &BaselineRequest,
    ) -> Result<BaselineResult, ServiceError> {
        let response = self.post_json("/search/raw", request).await?;
        let wire: BaselineWire = self.decode(response).await?;

        if let Some(detail) = wire.error {
            return Err(ServiceError::Rejected { detail });
        }
        let answer = wire
            .answer
            .ok_or_else(|| ServiceError::Decode("baseline response has no answer".to_string()))?;

        Ok(BaselineResult {
            provider: wire
                .provider
                .unwrap_or_else(|| request.provider.as_str().to_string()),
            latency_ms: wire.latency_ms,
            outcome: BaselineOutcome::Answer(answer),
        })
    }

    async fn list_files(&self) -> Result<Vec<IndexedFile>, ServiceError> {
        let response = self.get("/files").await?;
        let wire: FilesWire = self.decode(response).await?;
        Ok(wire.files)
    }

    async fn ingest_repository(&self, repo_url: &str, branch: &str) -> Result<(), ServiceError> {
        let response = self
            .post_json("/ingest/git", &GitIngestRequest { repo_url, branch })
            .await?;
        self.read_body(response).await.map(|_| ())
    }

    async fn ingest_file(&self, name: &str, content: Vec<u8>) -> Result<(), ServiceError> {
        let part = reqwest::multipart::Part::bytes(content)
            .file_name(name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| self.transport(e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.endpoint("/ingest/upload");
        tracing::debug!("POST {} ({})", url, name);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        self.read_body(response).await.map(|_| ())
    }
}
