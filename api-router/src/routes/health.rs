use axum::{extract::State, http::StatusCode};

use crate::api_state::ApiState;

pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// Ready only once the database answers.
pub async fn ready(State(state): State<ApiState>) -> StatusCode {
    match state.db.health().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
