//! Vector search execution over stored chunk vectors.
//!
//! The [`VectorIndex`] trait is the retrieval engine's view of the search
//! backend: given a query vector and a candidate budget, return the nearest
//! chunks ranked by similarity. The SQLite implementation scans stored
//! vectors and computes cosine similarity in process.
//!
//! Also provides the vector BLOB codec:
//! - [`vec_to_blob`] — encode a `&[f32]` as little-endian bytes
//! - [`blob_to_vec`] — decode a BLOB back into a `Vec<f32>`

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::{PipelineError, PipelineResult};
use crate::models::ChunkHit;

/// Executes approximate-nearest-neighbor queries against stored chunk
/// vectors. Returns chunk-level candidates, ranked by similarity descending,
/// without regard for which document they belong to.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, query_vec: &[f32], num_candidates: i64) -> PipelineResult<Vec<ChunkHit>>;
}

/// Brute-force cosine-similarity index over the `chunks` table.
pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn query(&self, query_vec: &[f32], num_candidates: i64) -> PipelineResult<Vec<ChunkHit>> {
        if query_vec.is_empty() {
            return Err(PipelineError::Retrieval(
                "query vector is empty".to_string(),
            ));
        }

        let rows = sqlx::query("SELECT document_id, vector FROM chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::Retrieval(e.to_string()))?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("vector");
            let stored = blob_to_vec(&blob);

            if stored.len() != query_vec.len() {
                return Err(PipelineError::Retrieval(format!(
                    "vector dimensionality mismatch: stored {} vs query {}",
                    stored.len(),
                    query_vec.len()
                )));
            }

            hits.push(ChunkHit {
                document_id: row.get("document_id"),
                score: cosine_similarity(query_vec, &stored) as f64,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(num_candidates.max(0) as usize);

        Ok(hits)
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors of equal length.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for a zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
