//! Pipeline error taxonomy.
//!
//! Every failure surfaced by the ingestion and retrieval pipeline carries
//! one of four classes: validation (client fault, rejected before any state
//! mutation), dispatch (the remote processing service failed or timed out),
//! storage (registry or chunk store persistence failed), and retrieval
//! (query execution failed — distinct from a query with zero matches,
//! which is an `Ok` empty result).

use thiserror::Error;

/// Classed error for all pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Client-fault condition: unsupported content type, empty content,
    /// oversized payload. Never creates a document record.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The remote processing service timed out, was unreachable, or
    /// reported a non-successful outcome.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// Registry upsert or chunk replace failed against the storage backend.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Vector query execution failed (storage unreachable, malformed
    /// vector dimensionality).
    #[error("retrieval failure: {0}")]
    Retrieval(String),
}

impl PipelineError {
    /// Machine-readable class tag, used in HTTP error envelopes and logs.
    pub fn class(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Dispatch(_) => "dispatch",
            PipelineError::Storage(_) => "storage",
            PipelineError::Retrieval(_) => "retrieval",
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
