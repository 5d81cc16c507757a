use std::sync::Arc;

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::document_chunk::DocumentChunk},
    utils::{config::AppConfig, embedding::EmbeddingClient},
};
use retrieval_pipeline::{VectorIndex, VectorMetadata, VectorRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    chunker::chunk_text,
    extract::{extract_text, FileType},
};

/// Whether the document ended up searchable. Chunk rows are committed before
/// indexing, so an embedding outage degrades to stored-but-not-searchable
/// instead of losing the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Indexed,
    StoredNotSearchable,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub document_name: String,
    pub chunk_count: usize,
    pub status: IngestionStatus,
}

/// Drives an upload end to end: extract, chunk, persist, embed, index.
#[derive(Clone)]
pub struct IngestionPipeline {
    db: Arc<SurrealDbClient>,
    embedding: Arc<EmbeddingClient>,
    vector_index: VectorIndex,
    max_file_bytes: usize,
    extraction_timeout_secs: u64,
    max_chunk_chars: usize,
    embedding_batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedding: Arc<EmbeddingClient>,
        vector_index: VectorIndex,
        config: &AppConfig,
    ) -> Self {
        Self {
            db,
            embedding,
            vector_index,
            max_file_bytes: config.max_file_bytes,
            extraction_timeout_secs: config.extraction_timeout_secs,
            max_chunk_chars: config.max_chunk_chars,
            embedding_batch_size: config.embedding_batch_size.max(1),
        }
    }

    pub async fn ingest_document(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        created_by: &str,
    ) -> Result<IngestionOutcome, AppError> {
        let file_name = file_name.trim();
        let (_, extension) = file_name.rsplit_once('.').ok_or(AppError::Validation(
            "File name has no extension".to_string(),
        ))?;
        let file_type = FileType::from_extension(extension)?;

        if DocumentChunk::count_by_document(file_name, &self.db).await? > 0 {
            return Err(AppError::Validation(format!(
                "A document named '{file_name}' is already ingested; delete it first"
            )));
        }

        let text = extract_text(
            bytes,
            file_type,
            self.max_file_bytes,
            self.extraction_timeout_secs,
        )
        .await?;

        let chunks = chunk_text(&text, self.max_chunk_chars)?;
        let rows: Vec<DocumentChunk> = chunks
            .into_iter()
            .enumerate()
            .map(|(ordinal, content)| {
                DocumentChunk::new(
                    file_name.to_string(),
                    file_type.as_str().to_string(),
                    u32::try_from(ordinal).unwrap_or(u32::MAX),
                    content,
                    created_by.to_string(),
                )
            })
            .collect();
        let chunk_count = rows.len();

        DocumentChunk::store_batch(rows.clone(), &self.db).await?;

        let status = match self.index_chunks(&rows).await {
            Ok(()) => IngestionStatus::Indexed,
            Err(e) => {
                warn!(
                    document = file_name,
                    "Chunks stored but indexing failed, document is not searchable: {e}"
                );
                IngestionStatus::StoredNotSearchable
            }
        };

        info!(
            document = file_name,
            chunk_count,
            status = ?status,
            "Finished document ingestion"
        );

        Ok(IngestionOutcome {
            document_name: file_name.to_string(),
            chunk_count,
            status,
        })
    }

    /// Embeds chunks in fixed-size batches and writes them to the vector
    /// index. Chunk ids double as vector ids, so a retry overwrites rather
    /// than duplicates.
    async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), AppError> {
        for batch in chunks.chunks(self.embedding_batch_size) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
            let vectors = self.embedding.embed_batch(texts).await?;

            let records: Vec<VectorRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, embedding)| VectorRecord {
                    id: chunk.id.clone(),
                    embedding,
                    metadata: VectorMetadata {
                        document_name: chunk.document_name.clone(),
                        chunk_index: chunk.chunk_index,
                        content: chunk.content.clone(),
                        word_count: chunk.word_count,
                        created_at: chunk.created_at,
                    },
                })
                .collect();

            self.vector_index.upsert_batch(records).await?;
        }
        Ok(())
    }

    /// Removes a document everywhere. Vectors go first; if chunk deletion
    /// then fails, the leftover rows are unsearchable rather than dangling
    /// vectors pointing at deleted chunks.
    pub async fn delete_document(&self, document_name: &str) -> Result<usize, AppError> {
        let chunk_count = DocumentChunk::count_by_document(document_name, &self.db).await?;
        if chunk_count == 0 {
            return Err(AppError::NotFound(format!(
                "No document named '{document_name}'"
            )));
        }

        self.vector_index.delete_by_document(document_name).await?;
        DocumentChunk::delete_by_document(document_name, &self.db).await?;

        info!(document = document_name, chunk_count, "Deleted document");
        Ok(chunk_count)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    const DIM: usize = 3;

    async fn test_pipeline() -> IngestionPipeline {
        let db = Arc::new(
            SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
                .await
                .expect("Failed to start in-memory surrealdb"),
        );
        db.ensure_initialized(DIM)
            .await
            .expect("Failed to initialize indexes");

        let embedding = Arc::new(EmbeddingClient::new_hashed(DIM));
        let vector_index = VectorIndex::new(Arc::clone(&db), DIM);
        let config = AppConfig {
            max_chunk_chars: 50,
            embedding_batch_size: 2,
            ..Default::default()
        };

        IngestionPipeline::new(db, embedding, vector_index, &config)
    }

    #[tokio::test]
    async fn test_ingest_stores_and_indexes_chunks() {
        let pipeline = test_pipeline().await;
        let text = "Refunds take five days. Shipping is free over fifty dollars. \
                    Support answers within one business day.";

        let outcome = pipeline
            .ingest_document(text.as_bytes().to_vec(), "faq.txt", "owner")
            .await
            .expect("ingestion failed");

        assert_eq!(outcome.document_name, "faq.txt");
        assert_eq!(outcome.status, IngestionStatus::Indexed);
        assert!(outcome.chunk_count > 1);

        let stored = DocumentChunk::list_by_document("faq.txt", &pipeline.db)
            .await
            .expect("listing failed");
        assert_eq!(stored.len(), outcome.chunk_count);
        let ordinals: Vec<u32> = stored.iter().map(|c| c.chunk_index).collect();
        let expected: Vec<u32> = (0..outcome.chunk_count as u32).collect();
        assert_eq!(ordinals, expected);

        let stats = pipeline.vector_index.stats().await.expect("stats failed");
        assert_eq!(stats.total_vectors, outcome.chunk_count);
    }

    #[tokio::test]
    async fn test_ingested_content_is_searchable() {
        let pipeline = test_pipeline().await;
        pipeline
            .ingest_document(
                b"Refunds take five days to process.".to_vec(),
                "refunds.txt",
                "owner",
            )
            .await
            .expect("ingestion failed");

        let query_vector = pipeline
            .embedding
            .embed("refunds")
            .await
            .expect("embed failed");
        let hits = pipeline
            .vector_index
            .query(query_vector, 5, None)
            .await
            .expect("query failed");

        assert!(!hits.is_empty());
        assert_eq!(hits[0].metadata.document_name, "refunds.txt");
    }

    #[tokio::test]
    async fn test_duplicate_document_name_is_rejected() {
        let pipeline = test_pipeline().await;
        pipeline
            .ingest_document(b"Original content here.".to_vec(), "guide.txt", "owner")
            .await
            .expect("first ingestion failed");

        let result = pipeline
            .ingest_document(b"Replacement content.".to_vec(), "guide.txt", "owner")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_extension_is_rejected() {
        let pipeline = test_pipeline().await;
        let result = pipeline
            .ingest_document(b"content".to_vec(), "no-extension", "owner")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected() {
        let pipeline = test_pipeline().await;
        let result = pipeline
            .ingest_document(b"content".to_vec(), "binary.exe", "owner")
            .await;
        assert!(matches!(
            result,
            Err(AppError::Extraction(
                common::error::ExtractionError::UnsupportedType(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_chunks_and_vectors() {
        let pipeline = test_pipeline().await;
        let outcome = pipeline
            .ingest_document(
                b"Some content worth deleting later.".to_vec(),
                "temp.txt",
                "owner",
            )
            .await
            .expect("ingestion failed");

        let removed = pipeline
            .delete_document("temp.txt")
            .await
            .expect("deletion failed");
        assert_eq!(removed, outcome.chunk_count);

        assert_eq!(
            DocumentChunk::count_by_document("temp.txt", &pipeline.db)
                .await
                .expect("count failed"),
            0
        );
        assert_eq!(
            pipeline
                .vector_index
                .stats()
                .await
                .expect("stats failed")
                .total_vectors,
            0
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let pipeline = test_pipeline().await;
        let result = pipeline.delete_document("never-uploaded.txt").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
