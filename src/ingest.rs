//! Ingestion job submission with a best-effort catalog refresh.
//!
//! Submitting a repository or file only queues work on the backend; the
//! indexer finishes asynchronously and nothing reports completion. After a
//! successful submission the coordinator re-polls the catalog exactly once,
//! after a fixed delay. That refresh is a cancellable one-shot task keyed
//! to the job that scheduled it:
//!
//! ```text
//! job 1 ok ──▶ [refresh for job 1 ····· 2s ·····]
//! job 2 ok ────────▶ ✗ abort   [refresh for job 2 ····· 2s ·····] ──▶ load_catalog()
//! ```
//!
//! A slower, older job that succeeds after a newer job has already
//! scheduled its refresh leaves the newer refresh alone; the later poll
//! covers both.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::catalog::FileCatalog;
use crate::models::{IngestionKind, IngestionStatus, IngestionTarget};
use crate::service::{bounded, DocService};

pub const DEFAULT_BRANCH: &str = "main";
pub const REPOSITORY_FALLBACK: &str = "Ingestion failed";
pub const FILE_FALLBACK: &str = "Upload failed";

/// Shared ingestion state read by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionView {
    in_flight: usize,
    latest_job: u64,
    status: Option<IngestionStatus>,
}

impl IngestionView {
    /// True while any submission is outstanding.
    pub fn is_ingesting(&self) -> bool {
        self.in_flight > 0
    }

    /// Outcome of the most recently submitted job, once it has settled.
    pub fn status(&self) -> Option<&IngestionStatus> {
        self.status.as_ref()
    }
}

struct ScheduledRefresh {
    job: u64,
    handle: JoinHandle<()>,
}

pub struct IngestionCoordinator {
    service: Arc<dyn DocService>,
    catalog: Arc<FileCatalog>,
    call_timeout: Duration,
    refresh_delay: Duration,
    state: watch::Sender<IngestionView>,
    refresh: Mutex<Option<ScheduledRefresh>>,
    /// Job whose catalog refresh most recently completed.
    refreshed: Arc<watch::Sender<u64>>,
}

impl IngestionCoordinator {
    pub fn new(
        service: Arc<dyn DocService>,
        catalog: Arc<FileCatalog>,
        call_timeout: Duration,
        refresh_delay: Duration,
    ) -> Self {
        let (tx, _rx) = watch::channel(IngestionView::default());
        let (refreshed, _rx) = watch::channel(0);
        Self {
            service,
            catalog,
            call_timeout,
            refresh_delay,
            state: tx,
            refresh: Mutex::new(None),
            refreshed: Arc::new(refreshed),
        }
    }

    pub fn view(&self) -> IngestionView {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IngestionView> {
        self.state.subscribe()
    }

    /// Queue a repository. A blank branch means `main`; a blank URL is
    /// ignored (returns `None`, nothing changes).
    pub async fn submit_git_ingestion(&self, url: &str, branch: &str) -> Option<IngestionStatus> {
        let url = url.trim();
        if url.is_empty() {
            tracing::debug!("ignoring blank repository URL");
            return None;
        }
        let branch = match branch.trim() {
            "" => DEFAULT_BRANCH,
            b => b,
        };
        let target = IngestionTarget::Repository {
            url: url.to_string(),
            branch: branch.to_string(),
        };
        Some(self.submit(target).await)
    }

    /// Upload a file's raw bytes for ingestion.
    pub async fn submit_file_ingestion(&self, name: &str, content: Vec<u8>) -> IngestionStatus {
        let target = IngestionTarget::File {
            name: name.to_string(),
            content,
        };
        self.submit(target).await
    }

    async fn submit(&self, target: IngestionTarget) -> IngestionStatus {
        let mut job = 0;
        self.state.send_modify(|s| {
            s.latest_job += 1;
            s.in_flight += 1;
            s.status = None;
            job = s.latest_job;
        });

        let success_message = target.success_message();
        let fallback = match target.kind() {
            IngestionKind::Repository => REPOSITORY_FALLBACK,
            IngestionKind::File => FILE_FALLBACK,
        };
        let call = async {
            match target {
                IngestionTarget::Repository { url, branch } => {
                    tracing::debug!("ingest job #{}: {} ({})", job, url, branch);
                    self.service.ingest_repository(&url, &branch).await
                }
                IngestionTarget::File { name, content } => {
                    tracing::debug!("ingest job #{}: upload {} ({} bytes)", job, name, content.len());
                    self.service.ingest_file(&name, content).await
                }
            }
        };

        let status = match bounded(self.call_timeout, call).await {
            Ok(()) => {
                tracing::info!("ingest job #{}: {}", job, success_message);
                IngestionStatus::success(success_message)
            }
            Err(e) => {
                tracing::warn!("ingest job #{} failed: {}", job, e);
                IngestionStatus::error(e.display_message(fallback))
            }
        };

        let written = status.clone();
        self.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if s.latest_job == job {
                s.status = Some(written);
            }
        });

        if status.is_success() {
            self.schedule_refresh(job);
        }
        status
    }

    fn schedule_refresh(&self, job: u64) {
        let mut slot = match self.refresh.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(pending) = slot.as_ref() {
            if pending.job > job && !pending.handle.is_finished() {
                tracing::debug!(
                    "ingest job #{}: refresh for newer job #{} already pending",
                    job,
                    pending.job
                );
                return;
            }
        }
        if let Some(stale) = slot.take() {
            if !stale.handle.is_finished() {
                tracing::debug!("cancelling catalog refresh for job #{}", stale.job);
            }
            stale.handle.abort();
        }

        let catalog = self.catalog.clone();
        let refreshed = self.refreshed.clone();
        let delay = self.refresh_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("catalog refresh for job #{}", job);
            catalog.load_catalog().await;
            refreshed.send_modify(|last| *last = (*last).max(job));
        });
        *slot = Some(ScheduledRefresh { job, handle });
    }

    /// True while a delayed refresh has been scheduled and not yet completed.
    pub fn refresh_pending(&self) -> bool {
        match self.refresh.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|r| !r.handle.is_finished()),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .is_some_and(|r| !r.handle.is_finished()),
        }
    }

    /// Wait until the most recently scheduled refresh, or a newer one that
    /// replaced it, has run. Returns false when no refresh was ever scheduled.
    ///
    /// The refresh stays in place while waiting, so a newer job can still
    /// cancel and reschedule it.
    pub async fn wait_for_refresh(&self) -> bool {
        let job = {
            let slot = match self.refresh.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            match slot.as_ref() {
                Some(refresh) => refresh.job,
                None => return false,
            }
        };
        let mut completed = self.refreshed.subscribe();
        let reached = completed.wait_for(|&last| last >= job).await.is_ok();
        reached
    }
}
