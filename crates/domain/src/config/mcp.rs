//! MCP (Model Context Protocol) configuration types for the domain layer.
//!
//! The `[mcp]` section of the gateway config points at a JSON descriptor
//! file mapping tool-server names to launch commands. The actual client
//! logic lives in the `fd-mcp-client` crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level MCP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Path to the JSON tool descriptor file.
    ///
    /// The file is a map of server name → launch descriptor:
    /// `{ "sheets": { "command": "npx", "args": [...], "transport": "stdio" } }`
    #[serde(default = "d_tools_path")]
    pub tools_path: PathBuf,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            tools_path: d_tools_path(),
        }
    }
}

fn d_tools_path() -> PathBuf {
    PathBuf::from("tools.json")
}

/// A single entry in the tool descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerDesc {
    /// The command to spawn (e.g. `"npx"`).
    pub command: String,

    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Transport type (`"stdio"` is the only supported kind).
    #[serde(default)]
    pub transport: McpTransportKind,

    /// Environment variables to set on the spawned process
    /// (e.g. `GOOGLE_APPLICATION_CREDENTIALS`).
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// A launch descriptor paired with its name from the descriptor file.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name (the descriptor file key).
    pub id: String,
    pub desc: McpServerDesc,
}

/// Transport kind for connecting to an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    #[default]
    Stdio,
    Sse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcp_config_default_path() {
        let cfg = McpConfig::default();
        assert_eq!(cfg.tools_path, PathBuf::from("tools.json"));
    }

    #[test]
    fn descriptor_deserializes() {
        let raw = r#"{
            "command": "uvx",
            "args": ["mcp-google-sheets"],
            "transport": "stdio",
            "env": { "GOOGLE_APPLICATION_CREDENTIALS": "/etc/frontdesk/sheets.json" }
        }"#;
        let desc: McpServerDesc = serde_json::from_str(raw).unwrap();
        assert_eq!(desc.command, "uvx");
        assert_eq!(desc.transport, McpTransportKind::Stdio);
        assert_eq!(
            desc.env.get("GOOGLE_APPLICATION_CREDENTIALS").unwrap(),
            "/etc/frontdesk/sheets.json"
        );
    }

    #[test]
    fn transport_kind_defaults_to_stdio() {
        let raw = r#"{ "command": "echo" }"#;
        let desc: McpServerDesc = serde_json::from_str(raw).unwrap();
        assert_eq!(desc.transport, McpTransportKind::Stdio);
    }
}
