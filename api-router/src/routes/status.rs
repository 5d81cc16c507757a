use axum::{extract::State, Json};
use common::{
    error::AppError,
    storage::types::chatbot_config::{ChatbotConfig, PublicStatus},
};

use crate::{api_state::ApiState, error::ApiError};

/// Public, unauthenticated status for the widget. Before the first
/// configuration write this reports the draft defaults.
pub async fn public_status(
    State(state): State<ApiState>,
) -> Result<Json<PublicStatus>, ApiError> {
    let config = match ChatbotConfig::get_current(&state.db).await {
        Ok(config) => config,
        Err(AppError::NotFound(_)) => ChatbotConfig::default(),
        Err(err) => return Err(err.into()),
    };

    Ok(Json(config.public_status()))
}
