//! `fd-mcp-client` — MCP (Model Context Protocol) client for frontdesk.
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types for communicating with MCP servers.
//! - A stdio transport that spawns child processes and communicates over
//!   stdin/stdout.
//! - An `McpManager` that connects every server named in the tool
//!   descriptor file, discovers their tools, and dispatches calls by flat
//!   tool name.
//!
//! Tool-set initialization is all-or-nothing: a descriptor file that is
//! missing or malformed, or a server that fails to spawn or complete the
//! handshake, aborts startup.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fd_mcp_client::{config, McpManager};
//!
//! let servers = config::load_descriptors("tools.json")?;
//! let manager = McpManager::connect(&servers).await?;
//!
//! for tool in manager.tool_definitions() {
//!     println!("{}", tool.name);
//! }
//!
//! let outcome = manager.call_tool("get_sheet_data", json!({"range": "A1:E100"})).await?;
//! ```

pub mod config;
pub mod manager;
pub mod protocol;
pub mod transport;

// Re-exports for convenience.
pub use manager::{McpError, McpManager};
pub use protocol::{McpToolDef, ToolCallResult};
