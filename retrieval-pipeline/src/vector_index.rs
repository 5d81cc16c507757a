use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{error::AppError, storage::db::SurrealDbClient};
use serde::{Deserialize, Serialize};
use tracing::debug;

const TABLE: &str = "vector_record";

/// Metadata carried alongside each vector, returned verbatim on query hits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VectorMetadata {
    pub document_name: String,
    pub chunk_index: u32,
    pub content: String,
    pub word_count: u32,
    pub created_at: DateTime<Utc>,
}

/// One vector plus its metadata, keyed by the chunk id it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// A query hit. Score is a similarity in (0, 1], derived from distance.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimension: usize,
}

/// Gateway to the vector table. All reads and writes of embeddings go through
/// here so the rest of the system never touches the knn syntax directly.
#[derive(Clone)]
pub struct VectorIndex {
    db: Arc<SurrealDbClient>,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct DistanceRow {
    id: String,
    distance: f32,
    metadata: VectorMetadata,
}

impl VectorIndex {
    pub fn new(db: Arc<SurrealDbClient>, dimension: usize) -> Self {
        Self { db, dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Writes a record under its chunk id. Re-upserting the same id replaces
    /// the previous vector and metadata, so retries cannot duplicate.
    pub async fn upsert(&self, record: VectorRecord) -> Result<(), AppError> {
        if record.embedding.len() != self.dimension {
            return Err(AppError::Validation(format!(
                "Vector has dimension {} but the index expects {}",
                record.embedding.len(),
                self.dimension
            )));
        }

        self.db
            .client
            .query(format!(
                "UPSERT type::thing('{TABLE}', $id) SET embedding = $embedding, metadata = $metadata"
            ))
            .bind(("id", record.id))
            .bind(("embedding", record.embedding))
            .bind(("metadata", record.metadata))
            .await?;

        Ok(())
    }

    pub async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), AppError> {
        for record in records {
            self.upsert(record).await?;
        }
        Ok(())
    }

    /// Nearest-neighbour query, optionally scoped to one document. Results
    /// come back best first with similarity scores.
    pub async fn query(
        &self,
        embedding: Vec<f32>,
        top_k: usize,
        document_filter: Option<&str>,
    ) -> Result<Vec<ScoredRecord>, AppError> {
        if embedding.len() != self.dimension {
            return Err(AppError::Validation(format!(
                "Query vector has dimension {} but the index expects {}",
                embedding.len(),
                self.dimension
            )));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let filter_clause = if document_filter.is_some() {
            " AND metadata.document_name = $document"
        } else {
            ""
        };
        // The knn operator and its target vector must be inline; only the
        // document filter stays a binding.
        let query = format!(
            "SELECT meta::id(id) AS id, metadata, vector::distance::knn() AS distance \
             FROM {TABLE} WHERE embedding <|{top_k},40|> {embedding:?}{filter_clause} \
             ORDER BY distance"
        );

        let mut request = self.db.client.query(query);
        if let Some(document) = document_filter {
            request = request.bind(("document", document.to_string()));
        }

        let rows: Vec<DistanceRow> = request.await?.take(0)?;

        debug!(hits = rows.len(), top_k, "Ran vector query");

        Ok(rows
            .into_iter()
            .map(|row| ScoredRecord {
                id: row.id,
                score: 1.0 / (1.0 + row.distance),
                metadata: row.metadata,
            })
            .collect())
    }

    /// Removes the given ids. Unknown ids are ignored.
    pub async fn delete(&self, ids: &[String]) -> Result<(), AppError> {
        for id in ids {
            self.db
                .client
                .query(format!("DELETE type::thing('{TABLE}', $id)"))
                .bind(("id", id.clone()))
                .await?;
        }
        Ok(())
    }

    pub async fn delete_by_document(&self, document_name: &str) -> Result<(), AppError> {
        self.db
            .client
            .query(format!(
                "DELETE FROM {TABLE} WHERE metadata.document_name = $document"
            ))
            .bind(("document", document_name.to_string()))
            .await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<IndexStats, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            total: usize,
        }

        let row: Option<CountRow> = self
            .db
            .client
            .query(format!("SELECT count() AS total FROM {TABLE} GROUP ALL"))
            .await?
            .take(0)?;

        Ok(IndexStats {
            total_vectors: row.map_or(0, |r| r.total),
            dimension: self.dimension,
        })
    }
}
