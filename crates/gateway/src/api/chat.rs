//! Chat API endpoints.
//!
//! - `POST /api/agent/chat`: returns the normalized output at once
//! - `POST /api/agent/chat/stream`: SSE, `message_start`, `text_delta`,
//!   `ui`, `section`, `actions`, `done` (or `error`)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::runtime::{encode, run_turn, ChatReply, TurnEvent, TurnInput, TurnMode};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    /// Replaces the configured route allow-list for this request.
    #[serde(default)]
    pub available_routes: Option<Vec<String>>,
    #[serde(default)]
    pub available_modals: Option<Vec<String>>,
}

impl ChatBody {
    fn into_input(self) -> Result<TurnInput, Response> {
        if self.session_id.trim().is_empty() || self.message.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "sessionId and message are required" })),
            )
                .into_response());
        }
        Ok(TurnInput {
            session_id: self.session_id,
            message: self.message,
            timezone: self.timezone,
            locale: self.locale,
            available_routes: self.available_routes,
            available_modals: self.available_modals,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/agent/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Response {
    let input = match body.into_input() {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_llm_provider(&state) {
        return resp;
    }

    // Dropping this handler (client hung up) cancels the turn.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let mut rx = run_turn(state, input, TurnMode::OneShot, cancel);

    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::Done { session_id, output, history_count } => {
                return Json(ChatReply {
                    session_id,
                    output,
                    history_count: Some(history_count),
                })
                .into_response();
            }
            TurnEvent::Error { error } => {
                return (StatusCode::BAD_GATEWAY, Json(serde_json::json!({ "error": error })))
                    .into_response();
            }
            TurnEvent::MessageStart { .. }
            | TurnEvent::TextDelta { .. }
            | TurnEvent::Ui { .. }
            | TurnEvent::Section { .. }
            | TurnEvent::Actions { .. } => { /* covered by Done */ }
        }
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "turn ended without a result" })),
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/agent/chat/stream (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_stream(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Response {
    let input = match body.into_input() {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_llm_provider(&state) {
        return resp;
    }

    let cancel = CancellationToken::new();
    let rx = run_turn(state, input, TurnMode::Streaming, cancel.clone());

    Sse::new(make_sse_stream(rx, cancel.drop_guard()))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// The stream owns `guard` from construction on, so dropping it (client
/// gone, even before the first poll) cancels the turn.
fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<TurnEvent>,
    guard: DropGuard,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            let (name, data) = encode(&event);
            yield Ok(Event::default().event(name).data(data.to_string()));
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pre-flight
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Return a structured 503 when no model backend is usable, so callers
/// can tell a broken deployment apart from a bad request.
fn require_llm_provider(state: &AppState) -> Result<(), Response> {
    let Err(e) = state.llm.default_provider() else {
        return Ok(());
    };

    let init_errors: Vec<serde_json::Value> = state
        .llm
        .init_errors()
        .iter()
        .map(|(provider_id, error)| {
            serde_json::json!({ "providerId": provider_id, "error": error })
        })
        .collect();

    Err((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({
            "error": e.to_string(),
            "kind": "configuration",
            "initErrors": init_errors,
        })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpolled_stream_cancels_on_drop() {
        let cancel = CancellationToken::new();
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        let stream = make_sse_stream(rx, cancel.clone().drop_guard());
        assert!(!cancel.is_cancelled());
        drop(stream);
        assert!(cancel.is_cancelled());
    }
}
