//! # docharbor CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docharbor init` | Create the SQLite database and run schema migrations |
//! | `docharbor ingest <file>` | Run one ingestion attempt for a local file |
//! | `docharbor search "<query>"` | Semantic search, prints matching filenames |
//! | `docharbor serve` | Start the HTTP server |
//!
//! All commands accept a `--config` flag pointing to a TOML configuration
//! file. See `config/docharbor.example.toml`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docharbor::chunk_store::{ChunkStore, SqliteChunkStore};
use docharbor::config::{load_config, Config};
use docharbor::db;
use docharbor::index::SqliteVectorIndex;
use docharbor::ingest::Orchestrator;
use docharbor::intake::Upload;
use docharbor::migrate;
use docharbor::processor::{HttpProcessorClient, ProcessorClient};
use docharbor::registry::SqliteRegistry;
use docharbor::retrieval::{query_filenames, RetrievalEngine};
use docharbor::server;

#[derive(Parser)]
#[command(
    name = "docharbor",
    about = "A document ingestion and semantic retrieval service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docharbor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest a local file: validate, register, dispatch to the processing
    /// service, and persist the returned chunks.
    Ingest {
        /// Path to the document to ingest.
        file: PathBuf,
    },

    /// Search stored documents by semantic similarity.
    Search {
        /// Query text.
        query: String,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docharbor=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Ingest { file } => run_ingest(&config, &file).await,
        Commands::Search { query } => run_search(&config, &query).await,
        Commands::Serve => server::run_server(&config).await,
    }
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.db.path.display());
    Ok(())
}

async fn run_ingest(config: &Config, file: &PathBuf) -> Result<()> {
    let content = std::fs::read(file)?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let registry = Arc::new(SqliteRegistry::new(pool.clone()));
    let chunk_store = Arc::new(SqliteChunkStore::new(pool.clone()));
    let processor = Arc::new(HttpProcessorClient::new(&config.processor)?);
    let orchestrator = Orchestrator::new(registry, chunk_store.clone(), processor, config);

    let receipt = orchestrator
        .ingest(Upload {
            filename,
            content,
            declared_type: None,
            document_id: None,
        })
        .await?;

    let chunk_count = chunk_store
        .count_for_document(&receipt.document_id)
        .await
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "?".to_string());

    println!("ingested {}", receipt.filename);
    println!("  document_id: {}", receipt.document_id);
    println!("  status: {}", receipt.status);
    println!("  size: {} bytes", receipt.size);
    println!("  chunks: {}", chunk_count);

    pool.close().await;
    Ok(())
}

async fn run_search(config: &Config, query: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let registry = Arc::new(SqliteRegistry::new(pool.clone()));
    let index = Arc::new(SqliteVectorIndex::new(pool.clone()));
    let processor: Arc<dyn ProcessorClient> = Arc::new(HttpProcessorClient::new(&config.processor)?);
    let engine = RetrievalEngine::new(index, registry, config.retrieval.clone());

    let results = query_filenames(processor.as_ref(), &engine, query).await?;

    if results.is_empty() {
        println!("no similar documents found");
    } else {
        for (i, filename) in results.iter().enumerate() {
            println!("{}. {}", i + 1, filename);
        }
    }

    pool.close().await;
    Ok(())
}
