//! MCP manager — holds all MCP server connections and routes tool calls.
//!
//! Tools are addressed by their flat name as advertised by `tools/list`
//! (the reservation prompt refers to them that way: `get_sheet_data`,
//! `update_cells`). When two servers advertise the same tool name the
//! first server in descriptor order wins and the collision is logged.

use std::collections::HashMap;

use serde_json::Value;

use fd_domain::config::{McpServerConfig, McpTransportKind};

use crate::protocol::{self, McpToolDef, ToolCallResult, ToolsListResult};
use crate::transport::{StdioTransport, TransportError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// McpServer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An MCP server connection (one per descriptor entry).
pub struct McpServer {
    /// Server name from the descriptor file.
    pub id: String,
    /// Tools discovered via `tools/list`.
    pub tools: Vec<McpToolDef>,
    transport: StdioTransport,
}

impl McpServer {
    /// Initialize a server: spawn the process, perform the MCP handshake,
    /// and discover tools. Every step is required; any failure aborts.
    async fn initialize(config: &McpServerConfig) -> Result<Self, McpError> {
        if config.desc.transport != McpTransportKind::Stdio {
            return Err(McpError::UnsupportedTransport {
                server: config.id.clone(),
                transport: format!("{:?}", config.desc.transport).to_lowercase(),
            });
        }

        let transport = StdioTransport::spawn(config).map_err(|e| McpError::Init {
            server: config.id.clone(),
            source: e,
        })?;

        // Step 1: `initialize` request.
        let init_params = protocol::initialize_params();
        let params_value = serde_json::to_value(&init_params).map_err(|e| {
            McpError::Protocol(format!("failed to serialize initialize params: {e}"))
        })?;

        let resp = transport
            .send_request("initialize", Some(params_value))
            .await
            .map_err(|e| McpError::Init {
                server: config.id.clone(),
                source: e,
            })?;

        if let Err(err) = resp.into_result() {
            return Err(McpError::Protocol(format!(
                "server {} initialize failed: {err}",
                config.id
            )));
        }

        tracing::debug!(server_id = %config.id, "MCP initialize response received");

        // Step 2: `notifications/initialized`.
        transport
            .send_notification("notifications/initialized")
            .await
            .map_err(|e| McpError::Init {
                server: config.id.clone(),
                source: e,
            })?;

        // Step 3: discover tools via `tools/list`.
        let tools_resp = transport
            .send_request("tools/list", None)
            .await
            .map_err(|e| McpError::Init {
                server: config.id.clone(),
                source: e,
            })?;

        let result_value = tools_resp.into_result().map_err(|err| {
            McpError::Protocol(format!("server {} tools/list failed: {err}", config.id))
        })?;

        let tools = serde_json::from_value::<ToolsListResult>(result_value)
            .map_err(|e| {
                McpError::Protocol(format!(
                    "server {} tools/list result unparseable: {e}",
                    config.id
                ))
            })?
            .tools;

        tracing::info!(
            server_id = %config.id,
            tool_count = tools.len(),
            "MCP server initialized"
        );

        Ok(Self {
            id: config.id.clone(),
            tools,
            transport,
        })
    }

    /// Call a tool on this server.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        if !self.transport.is_alive() {
            return Err(McpError::ServerDown(self.id.clone()));
        }

        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments
        });

        let resp = self
            .transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(McpError::Transport)?;

        let result_value = resp
            .into_result()
            .map_err(|err| McpError::Protocol(format!("tools/call failed: {err}")))?;

        serde_json::from_value::<ToolCallResult>(result_value)
            .map_err(|e| McpError::Protocol(format!("failed to parse tools/call result: {e}")))
    }

    async fn shutdown(&self) {
        tracing::info!(server_id = %self.id, "shutting down MCP server");
        self.transport.shutdown().await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// McpManager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Manager that holds all MCP server connections and the tool-name routes.
pub struct McpManager {
    servers: Vec<McpServer>,
    /// Flat tool name → index into `servers`.
    routes: HashMap<String, usize>,
}

impl std::fmt::Debug for McpManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpManager")
            .field("servers", &self.servers.len())
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl McpManager {
    /// Connect every configured server and build the tool routing table.
    ///
    /// All-or-nothing: the first server that fails to initialize fails the
    /// whole manager, and already-connected servers are shut down again.
    pub async fn connect(configs: &[McpServerConfig]) -> Result<Self, McpError> {
        let mut servers: Vec<McpServer> = Vec::with_capacity(configs.len());

        for config in configs {
            tracing::info!(
                server_id = %config.id,
                command = %config.desc.command,
                "initializing MCP server"
            );

            match McpServer::initialize(config).await {
                Ok(server) => servers.push(server),
                Err(e) => {
                    for started in &servers {
                        started.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }

        let mut routes = HashMap::new();
        for (idx, server) in servers.iter().enumerate() {
            for tool in &server.tools {
                if let Some(prev) = routes.insert(tool.name.clone(), idx) {
                    tracing::warn!(
                        tool = %tool.name,
                        winner = %servers[prev].id,
                        loser = %server.id,
                        "duplicate tool name, keeping first server"
                    );
                    routes.insert(tool.name.clone(), prev);
                }
            }
        }

        tracing::info!(
            servers = servers.len(),
            tools = routes.len(),
            "MCP manager ready"
        );

        Ok(Self { servers, routes })
    }

    /// All discovered tool definitions across all servers, routing order.
    pub fn tool_definitions(&self) -> Vec<&McpToolDef> {
        self.servers
            .iter()
            .enumerate()
            .flat_map(|(idx, server)| {
                server
                    .tools
                    .iter()
                    .filter(move |t| self.routes.get(&t.name) == Some(&idx))
            })
            .collect()
    }

    /// Call a tool by its flat name.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        let idx = self
            .routes
            .get(tool_name)
            .ok_or_else(|| McpError::ToolNotFound(tool_name.to_string()))?;

        self.servers[*idx].call_tool(tool_name, arguments).await
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn tool_count(&self) -> usize {
        self.routes.len()
    }

    /// Gracefully shut down all servers concurrently.
    pub async fn shutdown(&self) {
        let futs: Vec<_> = self.servers.iter().map(|s| s.shutdown()).collect();
        futures_util::future::join_all(futs).await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors specific to MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP server {server} failed to initialize: {source}")]
    Init {
        server: String,
        source: TransportError,
    },

    #[error("MCP server {server} requested unsupported transport '{transport}'")]
    UnsupportedTransport { server: String, transport: String },

    #[error("MCP transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("no MCP server advertises tool: {0}")]
    ToolNotFound(String),

    #[error("MCP server is down: {0}")]
    ServerDown(String),
}

impl From<McpError> for fd_domain::error::Error {
    fn from(e: McpError) -> Self {
        fd_domain::error::Error::Tool {
            tool: "mcp".into(),
            message: e.to_string(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use fd_domain::config::{McpServerDesc, McpTransportKind};
    use std::collections::HashMap as StdHashMap;

    #[tokio::test]
    async fn unsupported_transport_is_fatal() {
        let cfg = McpServerConfig {
            id: "remote".into(),
            desc: McpServerDesc {
                command: String::new(),
                args: vec![],
                transport: McpTransportKind::Sse,
                env: StdHashMap::new(),
            },
        };
        let err = McpManager::connect(&[cfg]).await.unwrap_err();
        assert!(matches!(err, McpError::UnsupportedTransport { .. }));
    }

    #[tokio::test]
    async fn unspawnable_server_is_fatal() {
        let cfg = McpServerConfig {
            id: "ghost".into(),
            desc: McpServerDesc {
                command: "/nonexistent/mcp-server".into(),
                args: vec![],
                transport: McpTransportKind::Stdio,
                env: StdHashMap::new(),
            },
        };
        let err = McpManager::connect(&[cfg]).await.unwrap_err();
        assert!(matches!(err, McpError::Init { .. }));
    }

    #[tokio::test]
    async fn empty_config_gives_empty_manager() {
        let manager = McpManager::connect(&[]).await.unwrap();
        assert_eq!(manager.server_count(), 0);
        assert_eq!(manager.tool_count(), 0);
        let err = manager
            .call_tool("get_sheet_data", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));
    }
}
