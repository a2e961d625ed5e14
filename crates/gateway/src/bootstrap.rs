//! AppState construction and background-task spawning.
//!
//! Startup is all-or-nothing: config validation errors, provider
//! initialization failures, and tool-set initialization failures all abort
//! the process with context.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;

use fd_domain::config::{Config, ConfigSeverity};
use fd_mcp_client::McpManager;
use fd_providers::ProviderRegistry;
use fd_sessions::{ConversationStore, SessionStore};

use crate::runtime::TurnRunner;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── LLM providers ────────────────────────────────────────────────
    let providers = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    tracing::info!(providers = providers.len(), "LLM provider registry ready");

    // ── MCP tool set ─────────────────────────────────────────────────
    let descriptors = fd_mcp_client::config::load_descriptors(&config.mcp.tools_path)
        .context("loading tool descriptors")?;
    let mcp = Arc::new(
        McpManager::connect(&descriptors)
            .await
            .context("initializing MCP tool set")?,
    );
    tracing::info!(
        servers = mcp.server_count(),
        tools = mcp.tool_count(),
        "MCP tool set ready"
    );

    // ── Session management ───────────────────────────────────────────
    let sessions = Arc::new(SessionStore::new(
        config.sessions.max_entries,
        Duration::seconds(config.sessions.idle_ttl_secs as i64),
    ));
    let conversations = Arc::new(ConversationStore::new());
    tracing::info!(
        max_entries = config.sessions.max_entries,
        idle_ttl_secs = config.sessions.idle_ttl_secs,
        "session stores ready"
    );

    // ── Agent runner ─────────────────────────────────────────────────
    let agent = Arc::new(TurnRunner::new(
        providers,
        mcp.clone(),
        sessions.clone(),
        conversations.clone(),
        config.llm.clone(),
    ));
    tracing::info!("agent runner ready");

    Ok(AppState {
        config,
        sessions,
        conversations,
        agent,
        mcp,
    })
}

/// Spawn the long-running background tasks.
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic session pruning (idle TTL + capacity cap) ───────────
    {
        let sessions = state.sessions.clone();
        let conversations = state.conversations.clone();
        let interval_secs = state.config.sessions.sweep_interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                for session_id in sessions.prune(chrono::Utc::now()) {
                    conversations.remove(&session_id);
                }
            }
        });
    }
    tracing::info!("background tasks spawned");
}
