//! Search orchestration across the augmented and baseline channels.
//!
//! A submission always drives the augmented (retrieval + generation)
//! channel and, when comparison mode is on, the baseline (generation-only)
//! channel too. Both calls run as independent tokio tasks; each writes only
//! into its own [`Channel`], guarded by the ticket it was issued with.
//!
//! # Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # use doc_insights::config::ServiceConfig;
//! # use doc_insights::orchestrator::SearchOrchestrator;
//! # use doc_insights::params::SearchParameters;
//! # use doc_insights::service::HttpDocService;
//! # async fn example() -> anyhow::Result<()> {
//! let service = Arc::new(HttpDocService::new(&ServiceConfig::default())?);
//! let orchestrator =
//!     SearchOrchestrator::new(service, SearchParameters::default(), Duration::from_secs(60));
//! orchestrator.toggle_comparison_mode();
//! if let Some(dispatch) = orchestrator.submit_search("how are releases tagged?") {
//!     dispatch.wait().await;
//! }
//! let session = orchestrator.view();
//! println!("{:?}", session.augmented().result().and_then(|r| r.answer.as_deref()));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::channel::{Channel, ChannelState, Ticket};
use crate::models::{AugmentedResult, BaselineResult};
use crate::params::SearchParameters;
use crate::service::{bounded, AugmentedRequest, BaselineRequest, DocService};

pub const AUGMENTED_FALLBACK: &str = "Search failed. Please try again.";
pub const BASELINE_FALLBACK: &str = "Raw LLM search failed";

/// Everything the presentation layer reads about the search session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSession {
    has_searched: bool,
    comparison_mode: bool,
    params: SearchParameters,
    augmented: Channel<AugmentedResult>,
    baseline: Channel<BaselineResult>,
}

impl SearchSession {
    /// True once any non-blank query has been submitted.
    pub fn has_searched(&self) -> bool {
        self.has_searched
    }

    pub fn comparison_mode(&self) -> bool {
        self.comparison_mode
    }

    pub fn params(&self) -> SearchParameters {
        self.params
    }

    pub fn augmented(&self) -> &ChannelState<AugmentedResult> {
        self.augmented.state()
    }

    pub fn baseline(&self) -> &ChannelState<BaselineResult> {
        self.baseline.state()
    }

    pub fn augmented_generation(&self) -> u64 {
        self.augmented.generation()
    }

    pub fn baseline_generation(&self) -> u64 {
        self.baseline.generation()
    }
}

/// Tasks spawned by one submission.
pub struct SearchDispatch {
    pub augmented: JoinHandle<()>,
    pub baseline: Option<JoinHandle<()>>,
}

impl SearchDispatch {
    /// Wait for every call in this submission to settle (applied or discarded).
    pub async fn wait(self) {
        if let Err(e) = self.augmented.await {
            tracing::warn!("augmented search task ended abnormally: {}", e);
        }
        if let Some(baseline) = self.baseline {
            if let Err(e) = baseline.await {
                tracing::warn!("baseline search task ended abnormally: {}", e);
            }
        }
    }
}

pub struct SearchOrchestrator {
    service: Arc<dyn DocService>,
    call_timeout: Duration,
    session: Arc<watch::Sender<SearchSession>>,
}

impl SearchOrchestrator {
    pub fn new(
        service: Arc<dyn DocService>,
        params: SearchParameters,
        call_timeout: Duration,
    ) -> Self {
        let session = SearchSession {
            params,
            ..Default::default()
        };
        let (tx, _rx) = watch::channel(session);
        Self {
            service,
            call_timeout,
            session: Arc::new(tx),
        }
    }

    /// Snapshot of the current session.
    pub fn view(&self) -> SearchSession {
        self.session.borrow().clone()
    }

    /// Change notifications for the session.
    pub fn subscribe(&self) -> watch::Receiver<SearchSession> {
        self.session.subscribe()
    }

    pub fn parameters(&self) -> SearchParameters {
        self.session.borrow().params
    }

    /// Edit the session's parameters through their bounds-checked setters.
    /// Calls already in flight keep the snapshot they were issued with.
    pub fn edit_parameters(&self, edit: impl FnOnce(&mut SearchParameters)) -> SearchParameters {
        let mut updated = SearchParameters::default();
        self.session.send_modify(|s| {
            edit(&mut s.params);
            updated = s.params;
        });
        updated
    }

    /// Flip comparison mode. The baseline channel is cleared either way, and
    /// any baseline call still in flight is invalidated.
    pub fn toggle_comparison_mode(&self) -> bool {
        let mut enabled = false;
        self.session.send_modify(|s| {
            s.comparison_mode = !s.comparison_mode;
            s.baseline.reset();
            enabled = s.comparison_mode;
        });
        tracing::debug!("comparison mode {}", if enabled { "on" } else { "off" });
        enabled
    }

    /// Submit a query.
    ///
    /// Blank queries are ignored: no state changes and no calls. Otherwise
    /// the augmented call is spawned with a snapshot of the current
    /// parameters, plus the baseline call if comparison mode is on.
    /// Must be called from within a tokio runtime.
    pub fn submit_search(&self, query: &str) -> Option<SearchDispatch> {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("ignoring blank query");
            return None;
        }

        let mut issued: Option<(SearchParameters, Ticket, Option<Ticket>)> = None;
        self.session.send_modify(|s| {
            s.has_searched = true;
            let augmented = s.augmented.begin();
            let baseline = if s.comparison_mode {
                s.baseline.reset();
                Some(s.baseline.begin())
            } else {
                None
            };
            issued = Some((s.params, augmented, baseline));
        });
        let (params, augmented_ticket, baseline_ticket) = issued?;

        let request = AugmentedRequest::new(query, &params);
        tracing::debug!(
            "search #{} top_k={} min_similarity={} provider={}",
            augmented_ticket.generation(),
            request.top_k,
            request.min_similarity,
            request.provider
        );
        let augmented = tokio::spawn(run_augmented(
            self.service.clone(),
            self.session.clone(),
            self.call_timeout,
            request,
            augmented_ticket,
        ));

        let baseline = baseline_ticket.map(|ticket| {
            let request = BaselineRequest {
                query: query.to_string(),
                provider: params.provider(),
            };
            tokio::spawn(run_baseline(
                self.service.clone(),
                self.session.clone(),
                self.call_timeout,
                request,
                ticket,
            ))
        });

        Some(SearchDispatch {
            augmented,
            baseline,
        })
    }
}

async fn run_augmented(
    service: Arc<dyn DocService>,
    session: Arc<watch::Sender<SearchSession>>,
    limit: Duration,
    request: AugmentedRequest,
    ticket: Ticket,
) {
    let outcome = match bounded(limit, service.search_augmented(&request)).await {
        Ok(result) => {
            tracing::info!(
                "search #{} returned {} sources",
                ticket.generation(),
                result.sources.len()
            );
            Ok(result)
        }
        Err(e) => {
            tracing::warn!("search #{} failed: {}", ticket.generation(), e);
            Err(e.display_message(AUGMENTED_FALLBACK))
        }
    };

    let applied = session.send_if_modified(|s| s.augmented.settle(ticket, outcome));
    if !applied {
        tracing::debug!(
            "discarded stale augmented response #{}",
            ticket.generation()
        );
    }
}

async fn run_baseline(
    service: Arc<dyn DocService>,
    session: Arc<watch::Sender<SearchSession>>,
    limit: Duration,
    request: BaselineRequest,
    ticket: Ticket,
) {
    let result = match bounded(limit, service.search_baseline(&request)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("baseline #{} failed: {}", ticket.generation(), e);
            BaselineResult::failed(request.provider.as_str(), e.display_message(BASELINE_FALLBACK))
        }
    };

    let applied = session.send_if_modified(|s| s.baseline.settle(ticket, Ok(result)));
    if !applied {
        tracing::debug!("discarded stale baseline response #{}", ticket.generation());
    }
}
