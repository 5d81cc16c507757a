use axum::{extract::State, Extension, Json};
use common::{
    error::AppError,
    storage::types::chatbot_config::{ChatbotConfig, ChatbotConfigPatch},
};

use crate::{api_state::ApiState, error::ApiError, middleware_api_auth::AuthIdentity};

/// Full configuration for the dashboard form. Falls back to the unsaved
/// defaults before the first write so the form always has values to render.
pub async fn get_config(State(state): State<ApiState>) -> Result<Json<ChatbotConfig>, ApiError> {
    let config = match ChatbotConfig::get_current(&state.db).await {
        Ok(config) => config,
        Err(AppError::NotFound(_)) => ChatbotConfig::default(),
        Err(err) => return Err(err.into()),
    };

    Ok(Json(config))
}

pub async fn update_config(
    State(state): State<ApiState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(patch): Json<ChatbotConfigPatch>,
) -> Result<Json<ChatbotConfig>, ApiError> {
    let updated = ChatbotConfig::update(&state.db, patch, &identity.0).await?;
    Ok(Json(updated))
}
