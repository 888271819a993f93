//! Axum Handlers for the plain HTTP endpoints.

use crate::state::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether the generation client initialized at startup.
    pub model_ready: bool,
    pub provider: &'static str,
    pub model: String,
}

/// Reports liveness and whether prompts can be served.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_ready: state.model_ready(),
        provider: state.config.provider.as_str(),
        model: state.config.chat_model.clone(),
    })
}
