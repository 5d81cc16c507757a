use axum::http::HeaderMap;
use common::storage::types::rate_limit_window::RateLimitWindow;

use crate::{api_state::ApiState, error::ApiError};

/// Picks the key a request is rate limited under. Authenticated identity
/// wins; anonymous traffic falls back to proxy-forwarded client addresses.
pub fn client_identifier(headers: &HeaderMap, identity: Option<&str>) -> String {
    if let Some(identity) = identity {
        return identity.to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|forwarded| forwarded.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Runs the sliding-window check and turns a denial into the 429 response.
pub async fn enforce(
    state: &ApiState,
    identifier: &str,
    endpoint: &str,
    max_requests: u32,
    window_minutes: i64,
) -> Result<(), ApiError> {
    let decision = RateLimitWindow::check_and_increment(
        &state.db,
        identifier,
        endpoint,
        max_requests,
        window_minutes,
    )
    .await;

    if decision.allowed {
        Ok(())
    } else {
        Err(ApiError::RateLimited {
            retry_after_seconds: decision.retry_after_seconds.unwrap_or(1),
            remaining: decision.remaining,
            reset_unix: decision.reset_time.timestamp(),
        })
    }
}
