//! Core runtime — the orchestrator that ties sessions, the system prompt,
//! LLM streaming, and MCP tool dispatch into one bounded loop.
//!
//! Entry point: [`AgentHandle::run_turn`] takes a session + user message
//! and returns a channel of [`TurnEvent`]s suitable for SSE streaming or
//! non-streaming aggregation.

pub mod prompt;
pub mod tools;
pub mod turn;

pub use turn::{TurnEvent, TurnInput, TurnRunner};

use tokio::sync::mpsc;

/// The seam between the HTTP façade and the reservation agent.
///
/// Handlers only ever see this trait; tests substitute a scripted stub so
/// the HTTP framing can be exercised without a provider or tool set.
pub trait AgentHandle: Send + Sync {
    /// Run one agent turn. Events arrive on the returned channel; the
    /// channel closes when the turn is finished.
    fn run_turn(&self, input: TurnInput) -> mpsc::Receiver<TurnEvent>;
}
