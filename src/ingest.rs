//! Ingestion orchestration.
//!
//! Drives one document through validate → register (status=processing) →
//! dispatch → store chunks → finalize. One attempt per call, no automatic
//! retries; every failure is reported synchronously with its class.
//!
//! A terminal status is always written back to the registry: `completed` on
//! success, `failed` on dispatch or chunk-persistence failure, so no
//! document is left in `processing` once its attempt finishes. The failed
//! write is best-effort — the original error is what the caller sees.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk_store::ChunkStore;
use crate::config::{Config, IntakeConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::intake::{self, Upload};
use crate::models::{Chunk, Document, DocumentStatus, IngestReceipt};
use crate::processor::{ProcessRequest, ProcessorClient};
use crate::registry::DocumentRegistry;

/// Composes the registry, chunk store, and processing dispatcher into the
/// per-document ingestion state machine. Collaborators are injected so the
/// orchestrator is testable with substitutable fakes.
pub struct Orchestrator {
    registry: Arc<dyn DocumentRegistry>,
    chunks: Arc<dyn ChunkStore>,
    processor: Arc<dyn ProcessorClient>,
    intake: IntakeConfig,
    dispatch_deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<dyn DocumentRegistry>,
        chunks: Arc<dyn ChunkStore>,
        processor: Arc<dyn ProcessorClient>,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            chunks,
            processor,
            intake: config.intake.clone(),
            dispatch_deadline: Duration::from_secs(config.processor.ingest_timeout_secs),
        }
    }

    /// Runs one full ingestion attempt for an upload.
    pub async fn ingest(&self, upload: Upload) -> PipelineResult<IngestReceipt> {
        // 1. Validate — nothing is persisted for a rejected upload.
        let content_type = intake::validate(&self.intake, &upload)?;

        // 2. Register with status=processing. A caller-supplied id means
        // re-ingestion: the record is overwritten and its lifecycle
        // restarts from processing.
        let mut doc = Document {
            id: upload
                .document_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            filename: upload.filename.clone(),
            content_type: content_type.clone(),
            size: upload.content.len() as i64,
            uploaded_at: Utc::now().timestamp(),
            status: DocumentStatus::Processing,
        };
        self.registry.upsert(&doc).await?;

        info!(
            document_id = %doc.id,
            filename = %doc.filename,
            size = doc.size,
            "document registered"
        );

        // 3. Dispatch under the ingestion deadline.
        let request = ProcessRequest {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            content: upload.content,
            content_type,
        };
        let dispatched = tokio::time::timeout(self.dispatch_deadline, self.processor.process(&request))
            .await
            .unwrap_or_else(|_| {
                Err(PipelineError::Dispatch(format!(
                    "processing timed out after {:?}",
                    self.dispatch_deadline
                )))
            });

        let processed = match dispatched {
            Ok(processed) => processed,
            Err(err) => return Err(self.fail(&mut doc, err).await),
        };

        // 4. Persist the new chunk generation.
        let chunks: Vec<Chunk> = processed
            .into_iter()
            .enumerate()
            .map(|(i, c)| Chunk {
                document_id: doc.id.clone(),
                chunk_index: i as i64,
                text: c.text,
                vector: c.vector,
            })
            .collect();

        if let Err(err) = self.chunks.replace(&doc.id, &chunks).await {
            return Err(self.fail(&mut doc, err).await);
        }

        // 5. Finalize.
        doc.status = DocumentStatus::Completed;
        self.registry.upsert(&doc).await?;

        info!(
            document_id = %doc.id,
            chunks = chunks.len(),
            "document ingested"
        );

        Ok(IngestReceipt {
            document_id: doc.id,
            filename: doc.filename,
            status: doc.status.as_str().to_string(),
            size: doc.size,
        })
    }

    /// Writes the terminal failed status back, best-effort, and hands the
    /// original error through.
    async fn fail(&self, doc: &mut Document, err: PipelineError) -> PipelineError {
        doc.status = DocumentStatus::Failed;
        if let Err(status_err) = self.registry.upsert(doc).await {
            warn!(
                document_id = %doc.id,
                error = %status_err,
                "could not persist failed status"
            );
        }
        warn!(document_id = %doc.id, class = err.class(), error = %err, "ingestion failed");
        err
    }
}
