//! Document registry: metadata records and their lifecycle status.
//!
//! The [`DocumentRegistry`] trait is the seam the orchestrator and the
//! retrieval engine depend on, so tests can substitute fakes and the
//! storage backend stays swappable.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::PipelineResult;
use crate::models::{Document, DocumentStatus};

/// Owns document metadata records. All operations are scoped to document
/// ids; no field validation happens here (that is intake's job).
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Create-or-replace by id. If a record with this id exists, every
    /// field is overwritten (never merged). Concurrent upserts for the same
    /// id resolve to last-write-wins.
    async fn upsert(&self, doc: &Document) -> PipelineResult<()>;

    /// Resolve a set of ids to their records. Unknown ids are silently
    /// omitted, not an error.
    async fn find_by_ids(&self, ids: &[String]) -> PipelineResult<Vec<Document>>;
}

/// SQLite-backed registry.
pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRegistry for SqliteRegistry {
    async fn upsert(&self, doc: &Document) -> PipelineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, content_type, size, uploaded_at, status)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                content_type = excluded.content_type,
                size = excluded.size,
                uploaded_at = excluded.uploaded_at,
                status = excluded.status
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.filename)
        .bind(&doc.content_type)
        .bind(doc.size)
        .bind(doc.uploaded_at)
        .bind(doc.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_ids(&self, ids: &[String]) -> PipelineResult<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // sqlx has no array binds for SQLite; build the placeholder list.
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, filename, content_type, size, uploaded_at, status \
             FROM documents WHERE id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let docs = rows
            .iter()
            .map(|row| {
                let status: String = row.get("status");
                Document {
                    id: row.get("id"),
                    filename: row.get("filename"),
                    content_type: row.get("content_type"),
                    size: row.get("size"),
                    uploaded_at: row.get("uploaded_at"),
                    status: DocumentStatus::parse(&status),
                }
            })
            .collect();

        Ok(docs)
    }
}
