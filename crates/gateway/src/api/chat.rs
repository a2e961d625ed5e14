//! Simplified chat endpoint — `POST /chat`.
//!
//! Takes `{ "message": "..." }`, runs one agent turn, and returns the
//! aggregated answer as `{ "response": "..." }`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use crate::runtime::{TurnEvent, TurnInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SimpleChatRequest {
    /// User message text. Required; an empty message is rejected.
    #[serde(default)]
    pub message: Option<String>,
    /// Optional session id for conversation continuity. Absent = a fresh
    /// session per request.
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn simple_chat(
    State(state): State<AppState>,
    Json(body): Json<SimpleChatRequest>,
) -> impl IntoResponse {
    // Validation happens before the agent is ever invoked.
    let message = match body.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "message field is required" })),
            )
                .into_response();
        }
    };

    let session_id = body
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    state.sessions.get_or_create(&session_id);
    state.sessions.touch(&session_id);

    let mut rx = state.agent.run_turn(TurnInput {
        session_id,
        user_message: message,
        model: None,
        temperature: None,
        max_tokens: None,
    });

    // Drain all events and collect the final response.
    let mut response = String::new();
    let mut errors = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::Final { content } => response = content,
            TurnEvent::Error { message } => errors.push(message),
            TurnEvent::AssistantDelta { .. }
            | TurnEvent::ToolCallEvent { .. }
            | TurnEvent::ToolResult { .. }
            | TurnEvent::UsageEvent { .. } => {}
        }
    }

    if let Some(first_error) = errors.into_iter().next() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": first_error })),
        )
            .into_response();
    }

    Json(serde_json::json!({ "response": response })).into_response()
}
