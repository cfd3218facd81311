//! End-to-end pipeline tests over a real SQLite database, with the remote
//! processing service replaced by a scripted fake.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use docharbor::chunk_store::{ChunkStore, SqliteChunkStore};
use docharbor::config::Config;
use docharbor::error::{PipelineError, PipelineResult};
use docharbor::index::SqliteVectorIndex;
use docharbor::ingest::Orchestrator;
use docharbor::intake::Upload;
use docharbor::migrate;
use docharbor::models::{DocumentStatus, ProcessedChunk};
use docharbor::processor::{ProcessRequest, ProcessorClient};
use docharbor::registry::{DocumentRegistry, SqliteRegistry};
use docharbor::retrieval::{query_filenames, RetrievalEngine};

/// Scripted stand-in for the remote processing service.
#[derive(Default)]
struct ScriptedProcessor {
    /// Chunks returned by the next `process` call, or `None` to fail.
    chunks: Mutex<Option<Vec<ProcessedChunk>>>,
    /// Vector returned for any `embed_query` call.
    query_vector: Mutex<Vec<f32>>,
}

impl ScriptedProcessor {
    fn will_return(&self, chunks: Vec<ProcessedChunk>) {
        *self.chunks.lock().unwrap() = Some(chunks);
    }

    fn will_fail(&self) {
        *self.chunks.lock().unwrap() = None;
    }

    fn embeds_queries_as(&self, vector: Vec<f32>) {
        *self.query_vector.lock().unwrap() = vector;
    }
}

#[async_trait]
impl ProcessorClient for ScriptedProcessor {
    async fn process(&self, _request: &ProcessRequest) -> PipelineResult<Vec<ProcessedChunk>> {
        match self.chunks.lock().unwrap().clone() {
            Some(chunks) => Ok(chunks),
            None => Err(PipelineError::Dispatch(
                "processing service timed out".to_string(),
            )),
        }
    }

    async fn embed_query(&self, _text: &str) -> PipelineResult<Vec<f32>> {
        Ok(self.query_vector.lock().unwrap().clone())
    }
}

fn processed(text: &str, vector: Vec<f32>) -> ProcessedChunk {
    ProcessedChunk {
        text: text.to_string(),
        vector,
    }
}

fn test_config() -> Config {
    toml::from_str(
        r#"
        [db]
        path = "/tmp/unused.sqlite"

        [server]
        bind = "127.0.0.1:0"

        [processor]
        endpoint = "http://localhost:0"
        ingest_timeout_secs = 5

        [retrieval]
        num_candidates = 100
        limit = 5
        score_threshold = 0.6
        "#,
    )
    .unwrap()
}

struct Harness {
    pool: SqlitePool,
    registry: Arc<SqliteRegistry>,
    chunk_store: Arc<SqliteChunkStore>,
    processor: Arc<ScriptedProcessor>,
    orchestrator: Orchestrator,
    engine: RetrievalEngine,
}

async fn harness() -> Harness {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool: SqlitePool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let config = test_config();
    let registry = Arc::new(SqliteRegistry::new(pool.clone()));
    let chunk_store = Arc::new(SqliteChunkStore::new(pool.clone()));
    let index = Arc::new(SqliteVectorIndex::new(pool.clone()));
    let processor = Arc::new(ScriptedProcessor::default());

    let orchestrator = Orchestrator::new(
        registry.clone(),
        chunk_store.clone(),
        processor.clone(),
        &config,
    );
    let engine = RetrievalEngine::new(index, registry.clone(), config.retrieval.clone());

    Harness {
        pool,
        registry,
        chunk_store,
        processor,
        orchestrator,
        engine,
    }
}

fn upload(filename: &str) -> Upload {
    Upload {
        filename: filename.to_string(),
        content: format!("contents of {}", filename).into_bytes(),
        declared_type: None,
        document_id: None,
    }
}

fn reupload(filename: &str, document_id: &str) -> Upload {
    Upload {
        document_id: Some(document_id.to_string()),
        ..upload(filename)
    }
}

async fn statuses(pool: &SqlitePool) -> Vec<(String, String)> {
    sqlx::query("SELECT id, status FROM documents ORDER BY uploaded_at")
        .fetch_all(pool)
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get("id"), row.get("status")))
        .collect()
}

#[tokio::test]
async fn test_ingest_persists_document_and_chunks() {
    let h = harness().await;
    h.processor.will_return(vec![
        processed("alpha", vec![1.0, 0.0, 0.0]),
        processed("beta", vec![0.0, 1.0, 0.0]),
        processed("gamma", vec![0.0, 0.0, 1.0]),
    ]);

    let receipt = h.orchestrator.ingest(upload("doc1.txt")).await.unwrap();
    assert_eq!(receipt.status, "completed");

    let docs = h
        .registry
        .find_by_ids(&[receipt.document_id.clone()])
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].status, DocumentStatus::Completed);
    assert_eq!(docs[0].filename, "doc1.txt");

    assert_eq!(
        h.chunk_store
            .count_for_document(&receipt.document_id)
            .await
            .unwrap(),
        3
    );

    let indices: Vec<i64> =
        sqlx::query("SELECT chunk_index FROM chunks WHERE document_id = ? ORDER BY chunk_index")
            .bind(&receipt.document_id)
            .fetch_all(&h.pool)
            .await
            .unwrap()
            .iter()
            .map(|row| row.get("chunk_index"))
            .collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_query_near_stored_vector_finds_document() {
    let h = harness().await;
    h.processor.will_return(vec![
        processed("alpha", vec![1.0, 0.0, 0.0]),
        processed("beta", vec![0.0, 1.0, 0.0]),
        processed("gamma", vec![0.0, 0.0, 1.0]),
    ]);
    h.orchestrator.ingest(upload("doc1.txt")).await.unwrap();

    // Nearly identical to the second chunk's vector.
    h.processor.embeds_queries_as(vec![0.05, 0.99, 0.0]);

    let results = query_filenames(h.processor.as_ref(), &h.engine, "about beta")
        .await
        .unwrap();
    assert_eq!(results, vec!["doc1.txt"]);
}

#[tokio::test]
async fn test_query_dissimilar_to_everything_is_empty() {
    let h = harness().await;
    h.processor
        .will_return(vec![processed("alpha", vec![1.0, 0.0, 0.0])]);
    h.orchestrator.ingest(upload("doc1.txt")).await.unwrap();

    // Orthogonal to the stored vector: similarity 0.0, threshold 0.6.
    h.processor.embeds_queries_as(vec![0.0, 1.0, 0.0]);

    let results = query_filenames(h.processor.as_ref(), &h.engine, "unrelated")
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_reingest_replaces_chunk_generation() {
    let h = harness().await;
    h.processor.will_return(vec![
        processed("one", vec![1.0, 0.0, 0.0]),
        processed("two", vec![0.0, 1.0, 0.0]),
        processed("three", vec![0.0, 0.0, 1.0]),
    ]);
    let first = h.orchestrator.ingest(upload("doc1.txt")).await.unwrap();
    assert_eq!(
        h.chunk_store
            .count_for_document(&first.document_id)
            .await
            .unwrap(),
        3
    );

    // Reprocessing the same id now produces a single chunk; the prior
    // three must be gone.
    h.processor
        .will_return(vec![processed("only", vec![0.5, 0.5, 0.0])]);
    let second = h
        .orchestrator
        .ingest(reupload("doc1.txt", &first.document_id))
        .await
        .unwrap();

    assert_eq!(second.document_id, first.document_id);
    assert_eq!(
        h.chunk_store
            .count_for_document(&first.document_id)
            .await
            .unwrap(),
        1
    );

    let texts: Vec<String> = sqlx::query("SELECT text FROM chunks WHERE document_id = ?")
        .bind(&first.document_id)
        .fetch_all(&h.pool)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("text"))
        .collect();
    assert_eq!(texts, vec!["only"]);
}

#[tokio::test]
async fn test_reingest_restarts_lifecycle_after_failure() {
    let h = harness().await;
    h.processor.will_fail();
    let err = h.orchestrator.ingest(upload("doc1.txt")).await.unwrap_err();
    assert_eq!(err.class(), "dispatch");

    let recorded = statuses(&h.pool).await;
    assert_eq!(recorded.len(), 1);
    let (id, status) = &recorded[0];
    assert_eq!(status, "failed");

    // A fresh attempt on the same id runs the sequence again and lands on
    // completed.
    h.processor
        .will_return(vec![processed("alpha", vec![1.0, 0.0, 0.0])]);
    let receipt = h
        .orchestrator
        .ingest(reupload("doc1.txt", id))
        .await
        .unwrap();
    assert_eq!(receipt.status, "completed");
    assert_eq!(statuses(&h.pool).await, vec![(id.clone(), "completed".to_string())]);
}

#[tokio::test]
async fn test_dispatch_failure_marks_failed_and_no_chunks() {
    let h = harness().await;
    h.processor.will_fail();

    let err = h.orchestrator.ingest(upload("doc2.txt")).await.unwrap_err();
    assert_eq!(err.class(), "dispatch");

    let recorded = statuses(&h.pool).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].1, "failed");

    let chunk_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&h.pool)
        .await
        .unwrap();
    assert_eq!(chunk_count, 0);
}

#[tokio::test]
async fn test_validation_rejection_leaves_no_record() {
    let h = harness().await;
    h.processor
        .will_return(vec![processed("alpha", vec![1.0, 0.0, 0.0])]);

    // Not UTF-8, no recognized magic bytes: unsupported content type.
    let err = h
        .orchestrator
        .ingest(Upload {
            filename: "binary.bin".to_string(),
            content: vec![0xff, 0xfe, 0x01, 0x02],
            declared_type: None,
            document_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.class(), "validation");

    let doc_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&h.pool)
        .await
        .unwrap();
    assert_eq!(doc_count, 0);
}

#[tokio::test]
async fn test_dedup_by_max_across_chunks_of_one_document() {
    let h = harness().await;
    h.processor.will_return(vec![
        processed("close", vec![1.0, 0.05, 0.0]),
        processed("far", vec![0.4, 0.9, 0.0]),
    ]);
    h.orchestrator.ingest(upload("doc1.txt")).await.unwrap();

    h.processor.embeds_queries_as(vec![1.0, 0.0, 0.0]);
    let results = query_filenames(h.processor.as_ref(), &h.engine, "close match")
        .await
        .unwrap();

    // Both chunks clear the threshold, but the document appears once.
    assert_eq!(results, vec!["doc1.txt"]);
}

#[tokio::test]
async fn test_ranking_across_documents() {
    let h = harness().await;

    h.processor
        .will_return(vec![processed("a", vec![1.0, 0.0, 0.0])]);
    h.orchestrator.ingest(upload("exact.txt")).await.unwrap();

    h.processor
        .will_return(vec![processed("b", vec![0.8, 0.6, 0.0])]);
    h.orchestrator.ingest(upload("nearby.txt")).await.unwrap();

    h.processor.embeds_queries_as(vec![1.0, 0.0, 0.0]);
    let results = query_filenames(h.processor.as_ref(), &h.engine, "query")
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], "exact.txt");
}

#[tokio::test]
async fn test_empty_query_is_validation_error() {
    let h = harness().await;
    let err = query_filenames(h.processor.as_ref(), &h.engine, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.class(), "validation");
}
