//! `fd-gateway` — the frontdesk HTTP gateway.
//!
//! Fronts the reservation agent with an OpenAI-compatible chat API plus a
//! simplified chat endpoint. The agent itself is a bounded tool loop over
//! an LLM provider and the MCP tool set; every booking rule it follows
//! lives in the system prompt.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
