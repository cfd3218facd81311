//! Chunk store: the set of text+vector chunks belonging to a document.
//!
//! A document's chunk set is a generation: every (re)processing replaces it
//! wholesale, never merges or appends. The SQLite implementation runs the
//! delete+insert inside one transaction, so a failed insert rolls back the
//! delete and the previous generation stays intact.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::{PipelineError, PipelineResult};
use crate::index::vec_to_blob;
use crate::models::Chunk;

/// Owns chunk persistence with all-or-nothing replacement semantics.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace the whole chunk set for `document_id` with `chunks`.
    ///
    /// An empty `chunks` slice is a no-op: existing chunks are left
    /// untouched. "No chunks produced" is not the same as "clear all".
    ///
    /// Not safe against two concurrent re-ingestions of the same document
    /// id; callers must serialize reprocessing per id.
    async fn replace(&self, document_id: &str, chunks: &[Chunk]) -> PipelineResult<()>;

    /// Number of chunks currently stored for a document. Used by tests and
    /// the CLI summary, not by the retrieval path.
    async fn count_for_document(&self, document_id: &str) -> PipelineResult<i64>;
}

/// SQLite-backed chunk store. Vectors are stored as little-endian f32 BLOBs.
pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn replace(&self, document_id: &str, chunks: &[Chunk]) -> PipelineResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        for chunk in chunks {
            if chunk.document_id != document_id {
                return Err(PipelineError::Storage(format!(
                    "chunk tagged for document {} passed to replace for {}",
                    chunk.document_id, document_id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (document_id, chunk_index, text, vector) VALUES (?, ?, ?, ?)",
            )
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_for_document(&self, document_id: &str) -> PipelineResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
