pub mod chat;
pub mod health;
pub mod openai_compat;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/v1/chat/completions", post(openai_compat::chat_completions))
        .route("/chat", post(chat::simple_chat))
}
