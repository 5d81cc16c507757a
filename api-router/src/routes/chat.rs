use axum::{extract::State, http::HeaderMap, Json};
use common::{error::AppError, storage::types::chatbot_config::ChatbotConfig};
use retrieval_pipeline::ChatTurn;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    api_state::ApiState,
    error::ApiError,
    rate_limit::{self, client_identifier},
};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Public chat endpoint used by the embedded widget. Anonymous, so the rate
/// limit keys on the forwarded client address.
pub async fn chat(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let identifier = client_identifier(&headers, None);
    rate_limit::enforce(
        &state,
        &identifier,
        "chat",
        state.config.chat_rate_limit_max_requests,
        state.config.chat_rate_limit_window_minutes,
    )
    .await?;

    // A missing singleton is an operator problem, not a client one; the
    // widget gets a server error, never a 404.
    let bot = match ChatbotConfig::get_current(&state.db).await {
        Ok(bot) => bot,
        Err(AppError::NotFound(_)) => {
            error!("Chat request received but the chatbot is not configured");
            return Err(ApiError::InternalError(
                "The assistant is not set up yet. Please try again later.".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let response = state
        .chat
        .respond(&request.message, &request.conversation_history, &bot)
        .await?;

    Ok(Json(ChatResponse { response }))
}
