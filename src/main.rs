use std::sync::Arc;

use bcr_api::{auth::repository::PgStore, config::AppConfig, create_router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("BCR API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    let state = match config.database_url.as_deref() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let store = Arc::new(
                PgStore::connect(database_url)
                    .await
                    .expect("Failed to create database pool"),
            );

            tracing::info!("Running database migrations...");
            store
                .migrate()
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations completed successfully");

            AppState::from_config(&config, store.clone(), store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            AppState::in_memory(&config)
        }
    };

    tracing::info!(
        "Issuing tokens valid for {}s, bcrypt cost {}",
        config.jwt_ttl_seconds,
        config.bcrypt_rounds
    );

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("BCR API is running on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await.expect("Server error");
}
