use futures::future::try_join_all;
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(DocumentChunk, "document_chunk", {
    document_name: String,
    file_type: String,
    chunk_index: u32,
    content: String,
    word_count: u32,
    created_by: String
});

/// Per-document aggregate derived from the chunk table. Documents have no row
/// of their own; one exists as long as at least one of its chunks does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub document_name: String,
    pub file_type: String,
    pub created_by: String,
    pub chunk_count: usize,
    pub word_count: u64,
    #[serde(deserialize_with = "deserialize_datetime", default)]
    pub created_at: DateTime<Utc>,
}

impl DocumentChunk {
    pub fn new(
        document_name: String,
        file_type: String,
        chunk_index: u32,
        content: String,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        let word_count = u32::try_from(content.split_whitespace().count()).unwrap_or(u32::MAX);
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            document_name,
            file_type,
            chunk_index,
            content,
            word_count,
            created_by,
        }
    }

    /// Persists one ingestion batch. Ordinals are assigned by the caller and
    /// must already be contiguous and zero-based.
    pub async fn store_batch(
        chunks: Vec<DocumentChunk>,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        try_join_all(chunks.into_iter().map(|chunk| db.store_item(chunk))).await?;
        Ok(())
    }

    pub async fn list_by_document(
        document_name: &str,
        db: &SurrealDbClient,
    ) -> Result<Vec<DocumentChunk>, AppError> {
        let chunks: Vec<DocumentChunk> = db
            .client
            .query(
                "SELECT * FROM type::table($table) WHERE document_name = $document_name ORDER BY chunk_index",
            )
            .bind(("table", Self::table_name()))
            .bind(("document_name", document_name.to_string()))
            .await?
            .take(0)?;

        Ok(chunks)
    }

    pub async fn count_by_document(
        document_name: &str,
        db: &SurrealDbClient,
    ) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            total: usize,
        }

        let row: Option<CountRow> = db
            .client
            .query(
                "SELECT count() AS total FROM type::table($table) WHERE document_name = $document_name GROUP ALL",
            )
            .bind(("table", Self::table_name()))
            .bind(("document_name", document_name.to_string()))
            .await?
            .take(0)?;

        Ok(row.map_or(0, |r| r.total))
    }

    pub async fn delete_by_document(
        document_name: &str,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        db.client
            .query("DELETE FROM type::table($table) WHERE document_name = $document_name")
            .bind(("table", Self::table_name()))
            .bind(("document_name", document_name.to_string()))
            .await?;

        Ok(())
    }

    pub async fn list_documents(db: &SurrealDbClient) -> Result<Vec<DocumentSummary>, AppError> {
        let summaries: Vec<DocumentSummary> = db
            .client
            .query(
                "SELECT document_name, file_type, created_by, count() AS chunk_count, \
                 math::sum(word_count) AS word_count, time::min(created_at) AS created_at \
                 FROM type::table($table) \
                 GROUP BY document_name, file_type, created_by \
                 ORDER BY document_name",
            )
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        Ok(summaries)
    }
}
