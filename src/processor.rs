//! Client for the remote content-processing service.
//!
//! The processing service owns text extraction, chunking, and embedding.
//! This module only defines the dispatch contract — raw bytes in, ordered
//! text+vector pairs out — and an HTTP JSON implementation. The same
//! service also embeds query text for the search path.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProcessorConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::ProcessedChunk;

/// One document handed to the processing service.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub id: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Dispatch contract consumed by the ingestion orchestrator and the query
/// path. Implementations must honor an externally imposed deadline; expiry
/// surfaces as a dispatch-class error, never a hang.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Send raw document content for processing. Returns the ordered chunk
    /// sequence on success, or a dispatch-class error if the service is
    /// unreachable, times out, or reports a non-successful outcome.
    async fn process(&self, request: &ProcessRequest) -> PipelineResult<Vec<ProcessedChunk>>;

    /// Convert a query string into an embedding vector.
    async fn embed_query(&self, text: &str) -> PipelineResult<Vec<f32>>;
}

#[derive(Serialize)]
struct ProcessBody<'a> {
    document_id: &'a str,
    filename: &'a str,
    content: String,
    content_type: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    chunks: Vec<ProcessedChunkBody>,
}

#[derive(Deserialize)]
struct ProcessedChunkBody {
    text: String,
    vector: Vec<f32>,
}

#[derive(Serialize)]
struct EmbedBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    vector: Vec<f32>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP JSON client for the processing service.
pub struct HttpProcessorClient {
    client: reqwest::Client,
    endpoint: String,
    ingest_timeout: Duration,
    query_timeout: Duration,
}

impl HttpProcessorClient {
    pub fn new(config: &ProcessorConfig) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PipelineError::Dispatch(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            ingest_timeout: Duration::from_secs(config.ingest_timeout_secs),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        })
    }
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    async fn process(&self, request: &ProcessRequest) -> PipelineResult<Vec<ProcessedChunk>> {
        let body = ProcessBody {
            document_id: &request.id,
            filename: &request.filename,
            content: base64::engine::general_purpose::STANDARD.encode(&request.content),
            content_type: &request.content_type,
        };

        let response = self
            .client
            .post(format!("{}/process", self.endpoint))
            .timeout(self.ingest_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Dispatch(format!("processing service call: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Dispatch(format!(
                "processing service returned HTTP {}",
                response.status()
            )));
        }

        let parsed: ProcessResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Dispatch(format!("invalid processing response: {}", e)))?;

        if parsed.status != "completed" {
            return Err(PipelineError::Dispatch(format!(
                "processing failed: {}",
                parsed.error.unwrap_or_else(|| parsed.status.clone())
            )));
        }

        Ok(parsed
            .chunks
            .into_iter()
            .map(|c| ProcessedChunk {
                text: c.text,
                vector: c.vector,
            })
            .collect())
    }

    async fn embed_query(&self, text: &str) -> PipelineResult<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embed", self.endpoint))
            .timeout(self.query_timeout)
            .json(&EmbedBody { text })
            .send()
            .await
            .map_err(|e| PipelineError::Dispatch(format!("embedding call: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Dispatch(format!(
                "embedding service returned HTTP {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Dispatch(format!("invalid embedding response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(PipelineError::Dispatch(format!(
                "embedding failed: {}",
                error
            )));
        }

        if parsed.vector.is_empty() {
            return Err(PipelineError::Dispatch(
                "embedding response carried no vector".to_string(),
            ));
        }

        Ok(parsed.vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> HttpProcessorClient {
        HttpProcessorClient::new(&ProcessorConfig {
            endpoint: server.base_url(),
            ingest_timeout_secs: 5,
            query_timeout_secs: 5,
        })
        .unwrap()
    }

    fn request() -> ProcessRequest {
        ProcessRequest {
            id: "doc1".to_string(),
            filename: "report.pdf".to_string(),
            content: b"%PDF-1.4 fake".to_vec(),
            content_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/process");
                then.status(200).json_body(serde_json::json!({
                    "document_id": "doc1",
                    "status": "completed",
                    "chunks": [
                        { "text": "first", "vector": [0.1, 0.2] },
                        { "text": "second", "vector": [0.3, 0.4] }
                    ]
                }));
            })
            .await;

        let client = client_for(&server);
        let chunks = client.process(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "first");
        assert_eq!(chunks[1].vector, vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_process_failure_status_is_dispatch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process");
                then.status(200).json_body(serde_json::json!({
                    "document_id": "doc1",
                    "status": "failed",
                    "error": "unreadable file"
                }));
            })
            .await;

        let client = client_for(&server);
        let err = client.process(&request()).await.unwrap_err();
        assert_eq!(err.class(), "dispatch");
        assert!(err.to_string().contains("unreadable file"));
    }

    #[tokio::test]
    async fn test_process_http_error_is_dispatch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process");
                then.status(503);
            })
            .await;

        let client = client_for(&server);
        let err = client.process(&request()).await.unwrap_err();
        assert_eq!(err.class(), "dispatch");
    }

    #[tokio::test]
    async fn test_embed_query_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embed");
                then.status(200)
                    .json_body(serde_json::json!({ "vector": [0.5, 0.6, 0.7] }));
            })
            .await;

        let client = client_for(&server);
        let vector = client.embed_query("what is in the report?").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.6, 0.7]);
    }

    #[tokio::test]
    async fn test_embed_query_error_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embed");
                then.status(200)
                    .json_body(serde_json::json!({ "error": "model not loaded" }));
            })
            .await;

        let client = client_for(&server);
        let err = client.embed_query("query").await.unwrap_err();
        assert_eq!(err.class(), "dispatch");
    }
}
