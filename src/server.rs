//! HTTP surface for ingestion and search.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents` | Upload a document for ingestion |
//! | `POST` | `/search` | Semantic search, returns matching filenames |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Errors follow a JSON envelope with the pipeline failure class as the
//! code: `{ "error": { "code": "dispatch", "message": "..." } }`.
//! A search with zero matches is not an error: it returns `200` with an
//! empty `results` array and a human-readable `message`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chunk_store::SqliteChunkStore;
use crate::config::Config;
use crate::db;
use crate::error::PipelineError;
use crate::index::SqliteVectorIndex;
use crate::ingest::Orchestrator;
use crate::intake::Upload;
use crate::migrate;
use crate::models::IngestReceipt;
use crate::processor::{HttpProcessorClient, ProcessorClient};
use crate::registry::SqliteRegistry;
use crate::retrieval::{query_filenames, RetrievalEngine};

/// Shared application state: the long-lived collaborators, constructed once
/// and reused across requests.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    engine: Arc<RetrievalEngine>,
    processor: Arc<dyn ProcessorClient>,
}

/// Starts the HTTP server: connects the database, runs migrations, wires
/// the collaborators, and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let registry = Arc::new(SqliteRegistry::new(pool.clone()));
    let chunk_store = Arc::new(SqliteChunkStore::new(pool.clone()));
    let index = Arc::new(SqliteVectorIndex::new(pool));
    let processor: Arc<dyn ProcessorClient> = Arc::new(HttpProcessorClient::new(&config.processor)?);

    let state = AppState {
        orchestrator: Arc::new(Orchestrator::new(
            registry.clone(),
            chunk_store,
            processor.clone(),
            config,
        )),
        engine: Arc::new(RetrievalEngine::new(
            index,
            registry,
            config.retrieval.clone(),
        )),
        processor,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/documents", post(handle_upload))
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(bind = %config.server.bind, "server listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Storage(_) | PipelineError::Retrieval(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            code: err.class().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct UploadBody {
    filename: String,
    /// Raw document bytes, base64-encoded.
    content_base64: String,
    #[serde(default)]
    content_type: Option<String>,
    /// Existing document id to re-ingest.
    #[serde(default)]
    document_id: Option<String>,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(body): Json<UploadBody>,
) -> Result<Json<IngestReceipt>, AppError> {
    let content = base64::engine::general_purpose::STANDARD
        .decode(&body.content_base64)
        .map_err(|e| AppError::from(PipelineError::Validation(format!("invalid base64: {}", e))))?;

    let receipt = state
        .orchestrator
        .ingest(Upload {
            filename: body.filename,
            content,
            declared_type: body.content_type,
            document_id: body.document_id,
        })
        .await?;

    Ok(Json(receipt))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchBody {
    query: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = query_filenames(state.processor.as_ref(), &state.engine, &body.query).await?;

    let message = if results.is_empty() {
        Some("no similar documents found".to_string())
    } else {
        None
    };

    Ok(Json(SearchResponse { results, message }))
}
