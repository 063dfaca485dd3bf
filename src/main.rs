//! # Doc Insights CLI (`insights`)
//!
//! Command-line front end over the orchestration library. Every command
//! talks to the documentation backend configured in `[service]`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `insights search "<query>"` | Retrieval + generation, optionally compared with generation only |
//! | `insights retrieve "<query>"` | Retrieval only, no generation |
//! | `insights files` | List indexed files grouped by repository |
//! | `insights ingest git <url>` | Queue a repository for ingestion |
//! | `insights ingest upload <path>` | Upload a file for ingestion |
//! | `insights health` | Check the backend is reachable |
//!
//! ## Examples
//!
//! ```bash
//! insights search "how are releases tagged?" --top-k 8 --compare
//! insights search "rollback steps" --provider groq --min-similarity 0.4
//! insights ingest git https://github.com/org/handbook --branch docs --wait
//! RUST_LOG=doc_insights=debug insights files
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use doc_insights::catalog::FileCatalog;
use doc_insights::channel::ChannelState;
use doc_insights::config::{self, Config};
use doc_insights::ingest::IngestionCoordinator;
use doc_insights::models::{AugmentedResult, BaselineResult, IngestionStatus};
use doc_insights::orchestrator::SearchOrchestrator;
use doc_insights::params::{Provider, SearchParameters};
use doc_insights::service::{DocService, HttpDocService};

const DEFAULT_CONFIG_PATH: &str = "./config/insights.toml";

/// Doc Insights CLI: search an indexed documentation corpus with and
/// without retrieval, and feed new content to the indexer.
#[derive(Parser)]
#[command(
    name = "insights",
    about = "Doc Insights: compare retrieval-augmented answers against plain generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When omitted, `./config/insights.toml` is used if present and
    /// built-in defaults otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `[service].base_url`.
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question through the retrieval + generation channel.
    Search {
        /// The question to ask.
        query: String,

        /// Number of chunks to retrieve (1-20; non-numeric means 5).
        #[arg(long, allow_hyphen_values = true)]
        top_k: Option<String>,

        /// Similarity floor (0.0-1.0; non-numeric means 0.0).
        #[arg(long, allow_hyphen_values = true)]
        min_similarity: Option<String>,

        /// Generation provider: openai, groq, or deepseek.
        #[arg(long)]
        provider: Option<String>,

        /// Also ask the generation-only channel for comparison.
        #[arg(long)]
        compare: bool,
    },

    /// Retrieve matching chunks without generating an answer.
    Retrieve {
        query: String,

        #[arg(long, allow_hyphen_values = true)]
        top_k: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        min_similarity: Option<String>,
    },

    /// List indexed files grouped by repository.
    Files,

    /// Submit content for ingestion.
    Ingest {
        #[command(subcommand)]
        action: IngestAction,
    },

    /// Check backend health.
    Health,
}

#[derive(Subcommand)]
enum IngestAction {
    /// Queue a Git repository.
    Git {
        /// Repository URL.
        url: String,

        /// Branch to track (blank means `main`).
        #[arg(long, default_value = "")]
        branch: String,

        /// Wait for the delayed catalog refresh and print the catalog.
        #[arg(long)]
        wait: bool,
    },

    /// Upload a single file.
    Upload {
        path: PathBuf,

        /// Wait for the delayed catalog refresh and print the catalog.
        #[arg(long)]
        wait: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_default(Path::new(DEFAULT_CONFIG_PATH))?,
    };
    if let Some(url) = &cli.url {
        config::override_base_url(&mut cfg, url)?;
    }
    Ok(cfg)
}

fn apply_overrides(
    params: &mut SearchParameters,
    top_k: Option<&str>,
    min_similarity: Option<&str>,
    provider: Option<Provider>,
) {
    if let Some(raw) = top_k {
        params.set_top_k(raw);
    }
    if let Some(raw) = min_similarity {
        params.set_min_similarity(raw);
    }
    if let Some(p) = provider {
        params.set_provider(p);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    let http = Arc::new(HttpDocService::new(&cfg.service)?);
    let service: Arc<dyn DocService> = http.clone();
    let timeout = cfg.service.timeout();

    match cli.command {
        Commands::Search {
            query,
            top_k,
            min_similarity,
            provider,
            compare,
        } => {
            let provider = provider
                .map(|p| p.parse::<Provider>())
                .transpose()?;
            let orchestrator =
                SearchOrchestrator::new(service, cfg.search.initial_parameters()?, timeout);
            orchestrator.edit_parameters(|p| {
                apply_overrides(p, top_k.as_deref(), min_similarity.as_deref(), provider)
            });
            if compare {
                orchestrator.toggle_comparison_mode();
            }

            let Some(dispatch) = orchestrator.submit_search(&query) else {
                println!("No query.");
                return Ok(());
            };
            dispatch.wait().await;

            let session = orchestrator.view();
            print_augmented(session.augmented());
            if session.comparison_mode() {
                print_baseline(session.baseline());
            }
        }
        Commands::Retrieve {
            query,
            top_k,
            min_similarity,
        } => {
            if query.trim().is_empty() {
                println!("No query.");
                return Ok(());
            }
            let mut params = cfg.search.initial_parameters()?;
            apply_overrides(&mut params, top_k.as_deref(), min_similarity.as_deref(), None);
            let result = http
                .retrieve(query.trim(), &params)
                .await
                .with_context(|| "Retrieval failed")?;
            if result.results.is_empty() {
                println!("No results.");
            }
            for (i, chunk) in result.results.iter().enumerate() {
                println!(
                    "{}. [{:.2}] {} #{}",
                    i + 1,
                    chunk.similarity,
                    chunk.file_path,
                    chunk.chunk_index
                );
                println!("    excerpt: \"{}\"", chunk.snippet.replace('\n', " ").trim());
            }
        }
        Commands::Files => {
            let catalog = FileCatalog::new(service, timeout);
            catalog.load_catalog().await;
            print_catalog(&catalog, cfg.catalog.group_display_limit);
        }
        Commands::Ingest { action } => {
            let catalog = Arc::new(FileCatalog::new(service.clone(), timeout));
            let coordinator = IngestionCoordinator::new(
                service,
                catalog.clone(),
                timeout,
                cfg.ingest.refresh_delay(),
            );

            let (status, wait) = match action {
                IngestAction::Git { url, branch, wait } => {
                    match coordinator.submit_git_ingestion(&url, &branch).await {
                        Some(status) => (status, wait),
                        None => bail!("Repository URL must not be blank"),
                    }
                }
                IngestAction::Upload { path, wait } => {
                    let name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .with_context(|| format!("Not a file path: {}", path.display()))?
                        .to_string();
                    let content = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    (coordinator.submit_file_ingestion(&name, content).await, wait)
                }
            };

            if !status.is_success() {
                bail!("{}", status.message);
            }
            print_status(&status);
            if wait && coordinator.wait_for_refresh().await {
                print_catalog(&catalog, cfg.catalog.group_display_limit);
            }
        }
        Commands::Health => {
            let health = http.health().await.with_context(|| {
                format!("Backend at {} is not reachable", http.base_url())
            })?;
            println!(
                "{} {}",
                health.status,
                health.version.as_deref().unwrap_or("")
            );
        }
    }

    Ok(())
}

fn print_augmented(state: &ChannelState<AugmentedResult>) {
    match state {
        ChannelState::Ready(result) => {
            println!("== Answer (retrieval + generation)");
            println!("{}", result.answer.as_deref().unwrap_or("(no answer)"));
            println!();

            if result.sources.is_empty() {
                println!("No sources.");
            }
            for (i, chunk) in result.sources.iter().enumerate() {
                println!(
                    "{}. [{:.2}] {} #{}",
                    i + 1,
                    chunk.similarity,
                    chunk.file_path,
                    chunk.chunk_index
                );
                println!("    excerpt: \"{}\"", chunk.snippet.replace('\n', " ").trim());
            }

            if let Some(m) = &result.retrieval_metrics {
                println!();
                println!(
                    "retrieval: {} returned, {} filtered, top {}, avg {}, {}",
                    opt(m.results_returned),
                    opt(m.results_filtered),
                    opt_f(m.top_similarity, 2),
                    opt_f(m.avg_similarity, 2),
                    opt_ms(m.latency_ms)
                );
            }
            if let Some(m) = &result.generation_metrics {
                println!(
                    "generation: {}, {} context tokens, {} sources used",
                    opt_ms(m.llm_latency_ms),
                    opt(m.context_tokens),
                    opt(m.sources_used)
                );
            }
        }
        ChannelState::Failed(message) => println!("Search error: {}", message),
        ChannelState::Searching { .. } | ChannelState::NotStarted => {}
    }
}

fn print_baseline(state: &ChannelState<BaselineResult>) {
    let Some(result) = state.result() else {
        return;
    };
    let model = match result.provider.parse::<Provider>() {
        Ok(provider) => format!("{} via {}", provider.label(), provider),
        Err(_) => result.provider.clone(),
    };
    println!();
    println!("== Baseline ({}, {})", model, opt_ms(result.latency_ms));
    match (result.answer(), result.error()) {
        (Some(answer), _) => println!("{}", answer),
        (_, Some(error)) => println!("Error: {}", error),
        _ => {}
    }
}

fn print_catalog(catalog: &FileCatalog, limit: usize) {
    let view = catalog.view();
    if view.files().is_empty() {
        println!("No files indexed yet.");
        return;
    }
    for group in view.groups(limit) {
        println!("{} ({})", group.name, group.total);
        for file in &group.shown {
            println!("    {}", file.file_name());
        }
        if let Some(more) = group.more_label() {
            println!("    {}", more);
        }
    }
}

fn print_status(status: &IngestionStatus) {
    println!("ok: {}", status.message);
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "—".to_string())
}

fn opt_f(v: Option<f64>, precision: usize) -> String {
    v.map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "—".to_string())
}

fn opt_ms(v: Option<f64>) -> String {
    v.map(|v| format!("{}ms", v.round()))
        .unwrap_or_else(|| "—".to_string())
}
