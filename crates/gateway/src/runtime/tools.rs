//! Tool plumbing for the runtime — exposes the discovered MCP tools to the
//! LLM and dispatches tool calls back to the MCP manager.

use serde_json::Value;

use fd_domain::tool::ToolDefinition;
use fd_mcp_client::McpManager;

/// Build the set of tool definitions exposed to the LLM.
///
/// One definition per discovered MCP tool, addressed by its flat name.
pub fn build_tool_definitions(mcp: &McpManager) -> Vec<ToolDefinition> {
    mcp.tool_definitions()
        .into_iter()
        .map(|tool| ToolDefinition {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        })
        .collect()
}

/// Dispatch a tool call. Returns `(content, is_error)`.
///
/// Dispatch failures are folded into the content string so the model can
/// observe them and recover; nothing is retried here.
pub async fn dispatch_tool(mcp: &McpManager, tool_name: &str, arguments: &Value) -> (String, bool) {
    tracing::debug!(tool = %tool_name, "dispatching tool call");

    match mcp.call_tool(tool_name, arguments.clone()).await {
        Ok(result) => {
            let is_error = result.is_error;
            let content = result.text();
            if is_error {
                tracing::warn!(tool = %tool_name, "tool reported an error result");
            }
            (content, is_error)
        }
        Err(e) => {
            tracing::warn!(tool = %tool_name, error = %e, "tool dispatch failed");
            (format!("tool call failed: {e}"), true)
        }
    }
}
