// handlers/token_handlers.rs
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// Diagnostic view of the cached OAuth token.
pub async fn token_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.token_manager.token_status() {
        Some(status) => (StatusCode::OK, Json(json!(status))),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Token is not available or expired."
            })),
        ),
    }
}
