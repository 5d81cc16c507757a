use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use middleware_api_auth::api_auth;

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod rate_limit;
mod routes;

/// Router for API functionality, version 1.
///
/// Management routes sit behind the admin key; chat and status stay public
/// for the widget, with chat guarded by the per-client rate limit.
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    let management = Router::new()
        .route(
            "/documents",
            post(routes::documents::upload_document).get(routes::documents::list_documents),
        )
        .route("/documents/{name}", delete(routes::documents::delete_document))
        .route("/search", get(routes::search::search))
        .route(
            "/config",
            get(routes::config::get_config).put(routes::config::update_config),
        )
        // Leaves headroom over the configured extraction byte ceiling for
        // the multipart framing itself.
        .layer(DefaultBodyLimit::max(
            app_state.config.max_file_bytes + 2 * 1024 * 1024,
        ))
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    let public = Router::new()
        .route("/chat", post(routes::chat::chat))
        .route("/status", get(routes::status::public_status))
        .route("/live", get(routes::health::live))
        .route("/ready", get(routes::health::ready));

    management.merge(public)
}
