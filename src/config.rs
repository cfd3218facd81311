use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Remote content-processing service settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ProcessorConfig {
    /// Base URL, e.g. `http://document-processing:50052`.
    pub endpoint: String,
    /// Ingestion deadline for one processing call. Large documents take
    /// minutes, so this is intentionally much longer than the per-operation
    /// storage timeouts.
    #[serde(default = "default_ingest_timeout_secs")]
    pub ingest_timeout_secs: u64,
    /// Deadline for embedding a single query string.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_ingest_timeout_secs() -> u64 {
    600
}
fn default_query_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: i64,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_size_bytes() -> i64 {
    5 * 1024 * 1024
}
fn default_allowed_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "text/plain".to_string(),
        "text/rtf".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_num_candidates")]
    pub num_candidates: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            num_candidates: default_num_candidates(),
            limit: default_limit(),
            score_threshold: default_score_threshold(),
        }
    }
}

fn default_num_candidates() -> i64 {
    100
}
fn default_limit() -> i64 {
    5
}
fn default_score_threshold() -> f64 {
    0.6
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.processor.endpoint.trim().is_empty() {
        anyhow::bail!("processor.endpoint must not be empty");
    }

    if config.intake.max_size_bytes <= 0 {
        anyhow::bail!("intake.max_size_bytes must be > 0");
    }

    if config.retrieval.num_candidates < 1 {
        anyhow::bail!("retrieval.num_candidates must be >= 1");
    }

    if config.retrieval.limit < 1 {
        anyhow::bail!("retrieval.limit must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.retrieval.score_threshold) {
        anyhow::bail!("retrieval.score_threshold must be in [0.0, 1.0]");
    }

    Ok(config)
}
