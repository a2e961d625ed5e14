//! Session management for frontdesk.
//!
//! Sessions are in-memory only: an entry per session id plus a
//! conversation checkpoint holding the message history the agent replays
//! on the next turn. Both stores are bounded — a capacity cap with
//! least-recently-used eviction and an idle TTL sweep.

pub mod history;
pub mod store;

pub use history::ConversationStore;
pub use store::{SessionEntry, SessionStore};
