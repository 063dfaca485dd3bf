//! TOML configuration parsing and validation.
//!
//! Every section is optional; omitted keys fall back to the defaults a
//! local development backend expects (`http://localhost:8000`, 60s timeout).
//!
//! ```toml
//! [service]
//! base_url = "http://localhost:8000"
//! timeout_secs = 60
//!
//! [search]
//! top_k = 5
//! min_similarity = 0.0
//! provider = "openai"
//!
//! [ingest]
//! refresh_delay_ms = 2000
//!
//! [catalog]
//! group_display_limit = 10
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::params::{Provider, SearchParameters};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

impl ServiceConfig {
    /// Upper bound applied to every external call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Initial search parameters. Values are raw: they pass through the
/// bounds-checked setters in [`SearchParameters`] rather than being rejected.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default)]
    pub min_similarity: f64,
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: 0.0,
            provider: default_provider(),
        }
    }
}

fn default_top_k() -> i64 {
    5
}
fn default_provider() -> String {
    "openai".to_string()
}

impl SearchConfig {
    /// Build the session's starting parameters.
    pub fn initial_parameters(&self) -> Result<SearchParameters> {
        let provider: Provider = self.provider.parse()?;
        let mut params = SearchParameters::default();
        params.set_top_k_value(self.top_k);
        params.set_min_similarity_value(self.min_similarity);
        params.set_provider(provider);
        Ok(params)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            refresh_delay_ms: default_refresh_delay_ms(),
        }
    }
}

fn default_refresh_delay_ms() -> u64 {
    2000
}

impl IngestConfig {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_group_display_limit")]
    pub group_display_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            group_display_limit: default_group_display_limit(),
        }
    }
}

fn default_group_display_limit() -> usize {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::default`].
///
/// Used for the implicit default location; an explicitly passed path
/// should go through [`load_config`] so a typo is reported.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

/// Replace `[service].base_url` (e.g. from `--url`) and re-validate.
pub fn override_base_url(config: &mut Config, url: &str) -> Result<()> {
    config.service.base_url = url.trim().to_string();
    validate(config).with_context(|| "Invalid --url override")
}

fn validate(config: &Config) -> Result<()> {
    let base_url = config.service.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        bail!(
            "service.base_url must start with http:// or https:// (got '{}')",
            config.service.base_url
        );
    }

    if config.service.timeout_secs == 0 {
        bail!("service.timeout_secs must be > 0");
    }

    if config.catalog.group_display_limit == 0 {
        bail!("catalog.group_display_limit must be > 0");
    }

    config
        .search
        .provider
        .parse::<Provider>()
        .with_context(|| "Invalid search.provider")?;

    Ok(())
}
