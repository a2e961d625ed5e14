use std::sync::Arc;

use fd_domain::config::Config;
use fd_mcp_client::McpManager;
use fd_sessions::{ConversationStore, SessionStore};

use crate::runtime::AgentHandle;

/// Shared application state passed to all API handlers.
///
/// Built once in [`crate::bootstrap::build_app_state`] and injected via
/// axum state — there are no lazily-initialized globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Session management ────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    pub conversations: Arc<ConversationStore>,

    // ── Agent runtime ─────────────────────────────────────────────────
    /// The reservation agent. Behind a trait so tests can stub the whole
    /// reasoning loop and exercise only the HTTP framing.
    pub agent: Arc<dyn AgentHandle>,
    /// MCP server connections; held here for shutdown.
    pub mcp: Arc<McpManager>,
}
