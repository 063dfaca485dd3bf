//! Core data models exchanged with the documentation backend.
//!
//! The service speaks snake_case JSON; field names here follow the domain
//! (`sources`, `snippet`) and serde attributes map them onto the wire
//! (`results`, `content_snippet`). Every metric is optional because the
//! service is free to omit any of them.

use serde::{Deserialize, Serialize};

/// One retrieved slice of a source document.
///
/// Display identity is `(file_path, chunk_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub file_path: String,
    pub chunk_index: u32,
    pub similarity: f64,
    #[serde(rename = "content_snippet", alias = "snippet", default)]
    pub snippet: String,
}

impl SourceChunk {
    pub fn key(&self) -> (&str, u32) {
        (&self.file_path, self.chunk_index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    #[serde(default)]
    pub results_returned: Option<u32>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub top_similarity: Option<f64>,
    #[serde(default)]
    pub avg_similarity: Option<f64>,
    /// Results dropped by the similarity floor.
    #[serde(default)]
    pub results_filtered: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    #[serde(default)]
    pub llm_latency_ms: Option<f64>,
    #[serde(default)]
    pub context_tokens: Option<u32>,
    #[serde(default)]
    pub sources_used: Option<u32>,
}

/// Response of the retrieval+generation channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AugmentedResult {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    /// Relevance order, highest similarity first.
    #[serde(rename = "results", alias = "sources", default)]
    pub sources: Vec<SourceChunk>,
    #[serde(default)]
    pub retrieval_metrics: Option<RetrievalMetrics>,
    #[serde(default)]
    pub generation_metrics: Option<GenerationMetrics>,
}

impl AugmentedResult {
    /// Enforce rank order. The sort is stable, so ties keep the
    /// order the service returned them in.
    pub fn ranked(mut self) -> Self {
        self.sources.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self
    }
}

/// Response of the retrieval-only endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetrievalResult {
    #[serde(default)]
    pub results: Vec<SourceChunk>,
    #[serde(default)]
    pub retrieval_metrics: Option<RetrievalMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BaselineOutcome {
    Answer(String),
    Error(String),
}

/// Generation-only (no retrieved context) response, or the failure that
/// replaced it. `answer` and `error` are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineResult {
    pub provider: String,
    pub latency_ms: Option<f64>,
    pub outcome: BaselineOutcome,
}

impl BaselineResult {
    pub fn failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            latency_ms: None,
            outcome: BaselineOutcome::Error(message.into()),
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            BaselineOutcome::Answer(a) => Some(a),
            BaselineOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            BaselineOutcome::Answer(_) => None,
            BaselineOutcome::Error(e) => Some(e),
        }
    }
}

/// A file known to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedFile {
    pub id: i64,
    /// Slash-delimited; the first segment names the repository or directory.
    pub path: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl IndexedFile {
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            hash: None,
            repo_name: None,
            created_at: None,
        }
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// What an ingestion job points at.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionTarget {
    Repository { url: String, branch: String },
    File { name: String, content: Vec<u8> },
}

impl IngestionTarget {
    pub fn kind(&self) -> IngestionKind {
        match self {
            IngestionTarget::Repository { .. } => IngestionKind::Repository,
            IngestionTarget::File { .. } => IngestionKind::File,
        }
    }

    /// Status line for a successfully submitted job.
    pub fn success_message(&self) -> String {
        match self {
            IngestionTarget::Repository { url, branch } => format!("Queued: {} ({})", url, branch),
            IngestionTarget::File { name, .. } => format!("Uploaded: {}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionKind {
    Repository,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

/// Transient outcome of the latest ingestion submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl IngestionStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}
