use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use common::storage::types::document_chunk::{DocumentChunk, DocumentSummary};
use ingestion_pipeline::IngestionStatus;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    api_state::ApiState,
    error::ApiError,
    middleware_api_auth::AuthIdentity,
    rate_limit::{self, client_identifier},
};

// The byte ceiling lives in config and is enforced by the extractor; the
// router's body limit (sized from the same config value) bounds the field.
#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_name: String,
    pub chunk_count: usize,
    pub status: IngestionStatus,
    pub message: String,
}

pub async fn upload_document(
    State(state): State<ApiState>,
    Extension(identity): Extension<AuthIdentity>,
    headers: HeaderMap,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = client_identifier(&headers, Some(&identity.0));
    rate_limit::enforce(
        &state,
        &identifier,
        "documents",
        state.config.ingest_rate_limit_max_requests,
        state.config.ingest_rate_limit_window_minutes,
    )
    .await?;

    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .ok_or(ApiError::ValidationError(
            "Uploaded file must have a file name".to_string(),
        ))?;

    let bytes = tokio::fs::read(input.file.contents.path())
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to read upload: {e}")))?;

    info!(file_name, bytes = bytes.len(), "Received document upload");

    let outcome = state
        .ingestion
        .ingest_document(bytes, &file_name, &identity.0)
        .await?;

    let message = match outcome.status {
        IngestionStatus::Indexed => "Document ingested and searchable".to_string(),
        IngestionStatus::StoredNotSearchable => {
            "Document stored but indexing failed; it is not searchable yet".to_string()
        }
    };

    Ok(Json(UploadResponse {
        document_name: outcome.document_name,
        chunk_count: outcome.chunk_count,
        status: outcome.status,
        message,
    }))
}

pub async fn list_documents(
    State(state): State<ApiState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    let documents = DocumentChunk::list_documents(&state.db).await?;
    Ok(Json(documents))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub document_name: String,
    pub chunks_removed: usize,
}

pub async fn delete_document(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let chunks_removed = state.ingestion.delete_document(&name).await?;
    Ok(Json(DeleteResponse {
        document_name: name,
        chunks_removed,
    }))
}
