use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

const MAX_TOP_K: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub document: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub document_name: String,
    pub chunk_index: u32,
    pub content: String,
    pub score: f32,
}

/// Direct vector search over the knowledge base, for the dashboard's
/// "test retrieval" view.
pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::ValidationError(
            "Query parameter 'q' cannot be empty".to_string(),
        ));
    }

    let top_k = params
        .top_k
        .unwrap_or(state.config.retrieval_top_k)
        .min(MAX_TOP_K)
        .max(1);

    let embedding = state.embedding.embed(query).await?;
    let records = state
        .vector_index
        .query(embedding, top_k, params.document.as_deref())
        .await?;

    let hits = records
        .into_iter()
        .map(|record| SearchHit {
            id: record.id,
            document_name: record.metadata.document_name,
            chunk_index: record.metadata.chunk_index,
            content: record.metadata.content,
            score: record.score,
        })
        .collect();

    Ok(Json(hits))
}
