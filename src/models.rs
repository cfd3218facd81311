//! Core data models for the ingestion and retrieval pipeline.
//!
//! These types represent the documents, chunks, and search candidates that
//! flow between the intake layer, the orchestrator, the stores, and the
//! retrieval engine.

use serde::Serialize;

/// Lifecycle status of a document.
///
/// Transitions only move forward along
/// `received → processing → {completed|failed}` within one ingestion
/// attempt. A fresh re-ingestion of the same id restarts the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Received,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Received => "received",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Parses the persisted string form. Unknown values map to `Failed`
    /// rather than erroring, so a corrupt row cannot wedge retrieval.
    pub fn parse(s: &str) -> DocumentStatus {
        match s {
            "received" => DocumentStatus::Received,
            "processing" => DocumentStatus::Processing,
            "completed" => DocumentStatus::Completed,
            _ => DocumentStatus::Failed,
        }
    }

    /// Terminal states admit no further transition within the same attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

/// Document metadata record, persisted by the registry.
///
/// `id` is assigned at ingestion time and immutable thereafter; `filename`,
/// `content_type`, and `size` are set once at creation. `uploaded_at` is
/// epoch seconds.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub uploaded_at: i64,
    pub status: DocumentStatus,
}

/// A chunk of a document's text paired with its embedding vector.
///
/// `chunk_index` is zero-based and contiguous within a document. A chunk
/// only exists as part of its document's current generation: the whole set
/// is replaced wholesale on every (re)processing.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Text + vector pair returned by the remote processing service, before it
/// is tied to a document id and position.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub text: String,
    pub vector: Vec<f32>,
}

/// A candidate chunk from the vector index: which document it belongs to
/// and how similar it was to the query (higher = more similar).
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub document_id: String,
    pub score: f64,
}

/// Response emitted for one ingestion attempt.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub document_id: String,
    pub filename: String,
    pub status: String,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            DocumentStatus::Received,
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_is_failed() {
        assert_eq!(DocumentStatus::parse("garbage"), DocumentStatus::Failed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DocumentStatus::Received.is_terminal());
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(DocumentStatus::Completed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
    }
}
