//! OpenAI-compatible `/v1/chat/completions` endpoint.
//!
//! Accepts the standard OpenAI `ChatCompletion` request format, feeds the
//! last user message to the reservation agent, and returns an OpenAI-shaped
//! response (both streaming and non-streaming). This enables drop-in use
//! from any client that speaks the OpenAI API.
//!
//! Session continuity: the `x-session-id` request header selects the
//! conversation; without it each request gets a fresh random session.
//!
//! Reported `usage` figures are character-length approximations of the
//! serialized input and the output text, not provider token counts.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};

use crate::runtime::{TurnEvent, TurnInput};
use crate::state::AppState;

/// Header carrying the client's session id.
pub const SESSION_HEADER: &str = "x-session-id";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
struct OpenAIChatResponse {
    id: String,
    object: &'static str,
    created: i64,
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: OpenAIUsage,
}

#[derive(Debug, Serialize)]
struct OpenAIChoice {
    index: u32,
    message: OpenAIResponseMessage,
    finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAIUsage {
    /// Character-length approximation: serialized input length vs output
    /// length. The total is the exact sum of the two.
    fn approximate(messages: &[OpenAIMessage], completion: &str) -> Self {
        let prompt_tokens = serde_json::to_string(messages)
            .map(|s| s.chars().count())
            .unwrap_or(0) as u32;
        let completion_tokens = completion.chars().count() as u32;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

// ── Streaming chunk types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAIChunk {
    id: String,
    object: &'static str,
    created: i64,
    model: String,
    choices: Vec<OpenAIChunkChoice>,
}

#[derive(Debug, Serialize)]
struct OpenAIChunkChoice {
    index: u32,
    delta: OpenAIChunkDelta,
    finish_reason: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct OpenAIChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

fn content_chunk(
    completion_id: &str,
    created: i64,
    model: &str,
    delta: OpenAIChunkDelta,
    finish_reason: Option<&'static str>,
) -> OpenAIChunk {
    OpenAIChunk {
        id: completion_id.to_string(),
        object: "chat.completion.chunk",
        created,
        model: model.to_string(),
        choices: vec![OpenAIChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat/completions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OpenAIChatRequest>,
) -> impl IntoResponse {
    if let Some(t) = body.temperature {
        if !(0.0..=2.0).contains(&t) {
            return openai_error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "temperature must be between 0 and 2",
            )
            .into_response();
        }
    }

    let user_message = match extract_last_user_message(&body.messages) {
        Some(msg) => msg,
        None => {
            return openai_error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "No user message found in messages array",
            )
            .into_response();
        }
    };

    let session_id = resolve_session(&state, &headers);

    let input = TurnInput {
        session_id,
        user_message,
        model: Some(body.model.clone()),
        temperature: body.temperature,
        max_tokens: body.max_tokens,
    };

    if body.stream {
        chat_completions_stream(state, body, input).await.into_response()
    } else {
        chat_completions_blocking(state, body, input).await.into_response()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Non-streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn chat_completions_blocking(
    state: AppState,
    body: OpenAIChatRequest,
    input: TurnInput,
) -> impl IntoResponse {
    let mut rx = state.agent.run_turn(input);

    // Drain all events and collect the final response.
    let mut final_content = String::new();
    let mut errors = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::Final { content } => final_content = content,
            TurnEvent::Error { message } => errors.push(message),
            TurnEvent::AssistantDelta { .. }
            | TurnEvent::ToolCallEvent { .. }
            | TurnEvent::ToolResult { .. }
            | TurnEvent::UsageEvent { .. } => { /* ignored in non-streaming */ }
        }
    }

    if let Some(first_error) = errors.into_iter().next() {
        return openai_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            &first_error,
        )
        .into_response();
    }

    let response = OpenAIChatResponse {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        object: "chat.completion",
        created: chrono::Utc::now().timestamp(),
        model: body.model,
        choices: vec![OpenAIChoice {
            index: 0,
            message: OpenAIResponseMessage {
                role: "assistant",
                content: final_content.clone(),
            },
            finish_reason: "stop",
        }],
        usage: OpenAIUsage::approximate(&body.messages, &final_content),
    };

    Json(response).into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn chat_completions_stream(
    state: AppState,
    body: OpenAIChatRequest,
    input: TurnInput,
) -> impl IntoResponse {
    let rx = state.agent.run_turn(input);

    let completion_id = format!("chatcmpl-{}", uuid::Uuid::new_v4().simple());
    let created = chrono::Utc::now().timestamp();

    let stream = make_openai_sse_stream(rx, completion_id, created, body.model);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Convert the turn event stream into OpenAI `chat.completion.chunk` SSE
/// frames: an initial role chunk, one chunk per non-whitespace content
/// token, a final `finish_reason: "stop"` chunk, then the `[DONE]` sentinel.
///
/// Tool-call and tool-result events are suppressed. Turn errors are
/// surfaced as content so streaming clients see them in the answer text.
fn make_openai_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<TurnEvent>,
    completion_id: String,
    created: i64,
    model: String,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        // Initial chunk carrying the assistant role.
        let initial = content_chunk(
            &completion_id,
            created,
            &model,
            OpenAIChunkDelta { role: Some("assistant"), content: None },
            None,
        );
        if let Ok(data) = serde_json::to_string(&initial) {
            yield Ok(Event::default().data(data));
        }

        while let Some(event) = rx.recv().await {
            let text = match event {
                TurnEvent::AssistantDelta { text } => text,
                TurnEvent::Error { message } => {
                    format!("An error occurred while processing the conversation: {message}")
                }
                // Tool events and usage are not surfaced on the OpenAI
                // stream; Final duplicates the accumulated deltas.
                TurnEvent::Final { .. }
                | TurnEvent::ToolCallEvent { .. }
                | TurnEvent::ToolResult { .. }
                | TurnEvent::UsageEvent { .. } => continue,
            };
            if text.trim().is_empty() {
                continue;
            }
            let chunk = content_chunk(
                &completion_id,
                created,
                &model,
                OpenAIChunkDelta { role: None, content: Some(text) },
                None,
            );
            if let Ok(data) = serde_json::to_string(&chunk) {
                yield Ok(Event::default().data(data));
            }
        }

        // Final chunk with finish_reason, then the stream terminator.
        let end = content_chunk(
            &completion_id,
            created,
            &model,
            OpenAIChunkDelta { role: None, content: None },
            Some("stop"),
        );
        if let Ok(data) = serde_json::to_string(&end) {
            yield Ok(Event::default().data(data));
        }
        yield Ok(Event::default().data("[DONE]"));
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extract the last user message from the OpenAI messages array.
fn extract_last_user_message(messages: &[OpenAIMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user" && !m.content.is_empty())
        .map(|m| m.content.clone())
}

/// Resolve the session for this request: the `x-session-id` header if
/// present, otherwise a fresh random id (stateless, OpenAI semantics).
fn resolve_session(state: &AppState, headers: &HeaderMap) -> String {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    state.sessions.get_or_create(&session_id);
    state.sessions.touch(&session_id);
    session_id
}

/// Build a standard OpenAI error response.
fn openai_error_response(
    status: StatusCode,
    error_type: &str,
    message: &str,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        })),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> OpenAIMessage {
        OpenAIMessage {
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn last_user_message_wins() {
        let messages = vec![
            msg("system", "you are a reservation agent"),
            msg("user", "first"),
            msg("assistant", "ok"),
            msg("user", "second"),
        ];
        assert_eq!(extract_last_user_message(&messages).as_deref(), Some("second"));
    }

    #[test]
    fn no_user_message_is_none() {
        let messages = vec![msg("system", "sys"), msg("assistant", "hi")];
        assert!(extract_last_user_message(&messages).is_none());
    }

    #[test]
    fn usage_total_is_exact_sum() {
        let messages = vec![msg("user", "book Tuesday 14:00")];
        let usage = OpenAIUsage::approximate(&messages, "Confirmed.");
        assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
        assert_eq!(usage.completion_tokens, "Confirmed.".chars().count() as u32);
        assert!(usage.prompt_tokens > 0);
    }

    #[test]
    fn chunk_delta_omits_absent_fields() {
        let chunk = content_chunk(
            "chatcmpl-test",
            0,
            "gpt-4o-mini",
            OpenAIChunkDelta {
                role: None,
                content: Some("hi".into()),
            },
            None,
        );
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains(r#""object":"chat.completion.chunk""#));
        assert!(json.contains(r#""content":"hi""#));
        assert!(!json.contains("role"));
        assert!(json.contains(r#""finish_reason":null"#));
    }
}
