// ABOUTME: Trellis API server entry point
// ABOUTME: Wires config, database, event bus, background jobs, and the router

use std::net::SocketAddr;

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trellis_api::{create_router, AppState};
use trellis_events::EventBus;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    info!("Starting Trellis server on port {}", config.port);

    let pool = trellis_storage::connect(config.database_path.clone()).await?;
    let events = EventBus::new();
    let state = AppState::new(pool, config.jwt_secret.clone(), events.clone());

    // Background jobs: notification fan-out and the daily deadline reminder
    trellis_notifications::start_listener(&events, state.notification_storage.clone());
    trellis_notifications::start_reminder_job(
        state.task_storage.clone(),
        events.clone(),
        config.reminder_hour_utc,
    );

    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
