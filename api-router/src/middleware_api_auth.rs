use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{api_state::ApiState, error::ApiError};

/// Identity attached to requests that pass the admin key check.
#[derive(Debug, Clone)]
pub struct AuthIdentity(pub String);

pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = extract_api_key(&request).ok_or(ApiError::Unauthorized(
        "You have to be authenticated".to_string(),
    ))?;

    if state.config.admin_api_key.is_empty() || api_key != state.config.admin_api_key {
        return Err(ApiError::Unauthorized(
            "You have to be authenticated".to_string(),
        ));
    }

    request.extensions_mut().insert(AuthIdentity("owner".to_string()));

    Ok(next.run(request).await)
}

fn extract_api_key(request: &Request) -> Option<String> {
    request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.trim()))
        })
        .map(String::from)
}
