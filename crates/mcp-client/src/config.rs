//! Tool descriptor file loading.
//!
//! The descriptor file is a JSON map of server name → launch descriptor,
//! the shape used by common MCP host configs:
//!
//! ```json
//! {
//!   "sheets": {
//!     "command": "uvx",
//!     "args": ["mcp-google-sheets"],
//!     "transport": "stdio",
//!     "env": { "GOOGLE_APPLICATION_CREDENTIALS": "/etc/frontdesk/sheets.json" }
//!   }
//! }
//! ```
//!
//! The canonical descriptor types live in `fd_domain::config` so the
//! gateway config deserializer can reference them without depending on
//! the full MCP client crate.

use std::collections::BTreeMap;
use std::path::Path;

pub use fd_domain::config::{McpServerConfig, McpServerDesc, McpTransportKind};

use fd_domain::error::{Error, Result};

/// Load and parse the tool descriptor file.
///
/// A missing or malformed file is an error — startup policy is to abort
/// rather than fall back to a default tool set. Entries are returned in
/// name order so connection order is deterministic.
pub fn load_descriptors(path: &Path) -> Result<Vec<McpServerConfig>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "tool descriptor file {} unreadable: {e}",
            path.display()
        ))
    })?;

    let map: BTreeMap<String, McpServerDesc> = serde_json::from_str(&raw).map_err(|e| {
        Error::Config(format!(
            "tool descriptor file {} malformed: {e}",
            path.display()
        ))
    })?;

    if map.is_empty() {
        return Err(Error::Config(format!(
            "tool descriptor file {} defines no servers",
            path.display()
        )));
    }

    Ok(map
        .into_iter()
        .map(|(id, desc)| McpServerConfig { id, desc })
        .collect())
}
