use std::time::Duration;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::{extract::FromRef, Router};
use common::{
    storage::types::rate_limit_window::RateLimitWindow,
    utils::config::get_config,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let api_state = ApiState::new(config.clone()).await?;
    info!(
        embedding_backend = api_state.embedding.backend_label(),
        embedding_dimension = api_state.embedding.dimension(),
        "Embedding client initialized"
    );

    // Background sweep of stale rate limit windows
    let sweep_db = api_state.db.clone();
    let sweep_interval = config.rate_limit_sweep_interval_secs;
    let sweep_window = config
        .chat_rate_limit_window_minutes
        .max(config.ingest_rate_limit_window_minutes);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            ticker.tick().await;
            if let Err(e) = RateLimitWindow::sweep_expired(&sweep_db, sweep_window).await {
                warn!("Rate limit sweep failed: {e}");
            }
        }
    });

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(AppState { api_state });

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}
