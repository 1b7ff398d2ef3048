pub mod chat;
pub mod sessions;

use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        // Chat (core runtime)
        .route("/api/agent/chat", post(chat::chat))
        .route("/api/agent/chat/stream", post(chat::chat_stream))
        // Session history
        .route("/api/agent/sessions/:id/history", get(sessions::get_history))
        .route("/api/agent/sessions/:id", delete(sessions::clear_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "pagepilot",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "chat": "POST /api/agent/chat",
            "stream": "POST /api/agent/chat/stream (text/event-stream)",
            "history": "GET /api/agent/sessions/:id/history",
            "clear": "DELETE /api/agent/sessions/:id",
        },
    }))
}
