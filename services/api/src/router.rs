//! Axum Router Configuration
//!
//! The relay serves its WebSocket on both `/` and `/ws`, plus a small health
//! probe.

use crate::{handlers, state::AppState, ws::ws_handler};
use axum::{Router, routing::get};
use std::sync::Arc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/healthz", get(handlers::health))
        .with_state(app_state)
}
