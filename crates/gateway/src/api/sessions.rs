//! Session history endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// GET /api/agent/sessions/:id/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let history = state.history.snapshot(&session_id).await;
    Json(serde_json::json!({
        "sessionId": session_id,
        "historyCount": history.len(),
        "history": history,
    }))
}

/// DELETE /api/agent/sessions/:id
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let cleared = state.history.clear(&session_id).await;
    if cleared {
        tracing::info!(session_id = %session_id, "session cleared");
    }
    Json(serde_json::json!({ "sessionId": session_id, "cleared": cleared }))
}
