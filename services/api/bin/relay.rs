//! Main Entrypoint for the Chat Relay Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the generation client once for all connections.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the WebSocket server and handling graceful shutdown.

use anyhow::Context;
use relay_api::{config::Config, router::create_router, state::AppState};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("WebSocket server starting...");

    // --- 3. Initialize Shared Services ---
    let bind_address = config.bind_address;
    let app_state = Arc::new(AppState::new(config));
    if !app_state.model_ready() {
        warn!("Serving without a generation client; connections will report the model as unavailable.");
    }

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state.clone()).layer(cors);

    // --- 5. Start Server ---
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!(
        provider = %app_state.config.provider,
        model = %app_state.config.chat_model,
        %bind_address,
        "WebSocket server running."
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
