//! # Doc Insights
//!
//! Client-side orchestration for a retrieval-augmented documentation backend.
//!
//! A query runs through two independently-lived channels: the augmented
//! channel (retrieval + generation, answers grounded in indexed chunks) and,
//! in comparison mode, the baseline channel (generation only). Ingestion
//! jobs (repository pull or file upload) are submitted separately; their
//! completion is observed only through a later catalog refresh.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────────┐        ┌───────────────────┐
//!  │ SearchParameters │──snap─▶│ SearchOrchestrator │──┬─▶ augmented channel
//!  └──────────────────┘        └─────────┬─────────┘  └─▶ baseline channel
//!                                        │
//!  ┌──────────────────────┐              ▼
//!  │ IngestionCoordinator │─────▶ ┌────────────┐
//!  └──────────┬───────────┘       │ DocService │ (HTTP backend)
//!             │ delayed refresh   └────────────┘
//!             ▼                          ▲
//!  ┌──────────────────────┐              │
//!  │     FileCatalog      │──────────────┘
//!  └──────────────────────┘
//! ```
//!
//! Each channel owns its own state; a response is applied only if it
//! belongs to the channel's latest submission (see [`channel`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`params`] | Bounds-checked search parameters |
//! | [`models`] | Wire and domain types |
//! | [`service`] | Backend contract and HTTP client |
//! | [`channel`] | Per-channel state and generation tickets |
//! | [`orchestrator`] | Augmented/baseline search flows |
//! | [`ingest`] | Ingestion submission and delayed refresh |
//! | [`catalog`] | Indexed-file list and grouped view |

pub mod catalog;
pub mod channel;
pub mod config;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod params;
pub mod service;
