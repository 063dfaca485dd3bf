//! Scripted in-memory backend for orchestration tests.
//!
//! Search calls park on a oneshot channel and are handed to the test as
//! [`Pending`] values, so a test decides when (and in which order) each
//! response arrives. Catalog and ingestion calls follow a queue of
//! [`Scripted`] outcomes and default to immediate success.

#![allow(dead_code)]

use async_trait::async_trait;
use doc_insights::models::{AugmentedResult, BaselineOutcome, BaselineResult, IndexedFile, SourceChunk};
use doc_insights::service::{AugmentedRequest, BaselineRequest, DocService, ServiceError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// A search call waiting for the test to answer it.
pub struct Pending<Req, T> {
    pub request: Req,
    reply: oneshot::Sender<Result<T, ServiceError>>,
}

impl<Req, T> Pending<Req, T> {
    pub fn respond(self, outcome: Result<T, ServiceError>) {
        let _ = self.reply.send(outcome);
    }
}

pub type PendingAugmented = Pending<AugmentedRequest, AugmentedResult>;
pub type PendingBaseline = Pending<BaselineRequest, BaselineResult>;

/// Receivers the test drains to see which search calls were issued.
pub struct Controls {
    pub augmented: mpsc::UnboundedReceiver<PendingAugmented>,
    pub baseline: mpsc::UnboundedReceiver<PendingBaseline>,
}

pub enum Scripted<T> {
    Ok(T),
    Fail(ServiceError),
    Hold(oneshot::Receiver<Result<T, ServiceError>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestCall {
    Repository { url: String, branch: String },
    File { name: String, content: Vec<u8> },
}

pub struct ScriptedService {
    augmented: mpsc::UnboundedSender<PendingAugmented>,
    baseline: mpsc::UnboundedSender<PendingBaseline>,
    files: Mutex<Vec<IndexedFile>>,
    file_script: Mutex<VecDeque<Scripted<Vec<IndexedFile>>>>,
    ingest_script: Mutex<VecDeque<Scripted<()>>>,
    ingest_calls: Mutex<Vec<IngestCall>>,
    list_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> (Arc<Self>, Controls) {
        let (aug_tx, aug_rx) = mpsc::unbounded_channel();
        let (base_tx, base_rx) = mpsc::unbounded_channel();
        let service = Arc::new(Self {
            augmented: aug_tx,
            baseline: base_tx,
            files: Mutex::new(Vec::new()),
            file_script: Mutex::new(VecDeque::new()),
            ingest_script: Mutex::new(VecDeque::new()),
            ingest_calls: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        });
        let controls = Controls {
            augmented: aug_rx,
            baseline: base_rx,
        };
        (service, controls)
    }

    /// List returned by `list_files` when no scripted outcome is queued.
    pub fn set_files(&self, paths: &[&str]) {
        *self.files.lock().unwrap() = indexed(paths);
    }

    pub fn script_files(&self, outcome: Scripted<Vec<IndexedFile>>) {
        self.file_script.lock().unwrap().push_back(outcome);
    }

    pub fn script_ingest(&self, outcome: Scripted<()>) {
        self.ingest_script.lock().unwrap().push_back(outcome);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn ingest_calls(&self) -> Vec<IngestCall> {
        self.ingest_calls.lock().unwrap().clone()
    }

    async fn run_ingest(&self, call: IngestCall) -> Result<(), ServiceError> {
        self.ingest_calls.lock().unwrap().push(call);
        let next = self.ingest_script.lock().unwrap().pop_front();
        resolve(next, ()).await
    }
}

async fn resolve<T>(next: Option<Scripted<T>>, default: T) -> Result<T, ServiceError> {
    match next {
        None => Ok(default),
        Some(Scripted::Ok(value)) => Ok(value),
        Some(Scripted::Fail(e)) => Err(e),
        Some(Scripted::Hold(rx)) => rx
            .await
            .unwrap_or_else(|_| Err(ServiceError::Transport("reply dropped".into()))),
    }
}

async fn park<Req, T>(
    tx: &mpsc::UnboundedSender<Pending<Req, T>>,
    request: Req,
) -> Result<T, ServiceError> {
    let (reply, rx) = oneshot::channel();
    tx.send(Pending { request, reply })
        .map_err(|_| ServiceError::Transport("controls dropped".into()))?;
    rx.await
        .unwrap_or_else(|_| Err(ServiceError::Transport("reply dropped".into())))
}

#[async_trait]
impl DocService for ScriptedService {
    async fn search_augmented(
        &self,
        request: &AugmentedRequest,
    ) -> Result<AugmentedResult, ServiceError> {
        park(&self.augmented, request.clone()).await
    }

    async fn search_baseline(
        &self,
        request: &BaselineRequest,
    ) -> Result<BaselineResult, ServiceError> {
        park(&self.baseline, request.clone()).await
    }

    async fn list_files(&self) -> Result<Vec<IndexedFile>, ServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.file_script.lock().unwrap().pop_front();
        let current = self.files.lock().unwrap().clone();
        resolve(next, current).await
    }

    async fn ingest_repository(&self, repo_url: &str, branch: &str) -> Result<(), ServiceError> {
        self.run_ingest(IngestCall::Repository {
            url: repo_url.to_string(),
            branch: branch.to_string(),
        })
        .await
    }

    async fn ingest_file(&self, name: &str, content: Vec<u8>) -> Result<(), ServiceError> {
        self.run_ingest(IngestCall::File {
            name: name.to_string(),
            content,
        })
        .await
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────

pub fn indexed(paths: &[&str]) -> Vec<IndexedFile> {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedFile::new(i as i64 + 1, *p))
        .collect()
}

pub fn augmented(query: &str) -> AugmentedResult {
    AugmentedResult {
        query: Some(query.to_string()),
        answer: Some(format!("answer to {}", query)),
        sources: vec![SourceChunk {
            file_path: "handbook/release.md".to_string(),
            chunk_index: 0,
            similarity: 0.82,
            snippet: "Tag releases from main.".to_string(),
        }],
        retrieval_metrics: None,
        generation_metrics: None,
    }
}

pub fn baseline(provider: &str, answer: &str) -> BaselineResult {
    BaselineResult {
        provider: provider.to_string(),
        latency_ms: Some(120.0),
        outcome: BaselineOutcome::Answer(answer.to_string()),
    }
}

pub fn detail(status: u16, message: &str) -> ServiceError {
    ServiceError::Status {
        status,
        detail: Some(message.to_string()),
    }
}

pub fn no_detail(status: u16) -> ServiceError {
    ServiceError::Status {
        status,
        detail: None,
    }
}
