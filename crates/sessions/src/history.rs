//! In-memory conversation checkpoints.
//!
//! The agent replays a session's message history on every turn. History is
//! held only in process memory, keyed by session id — the functional
//! equivalent of an agent framework's in-memory checkpoint saver.

use std::collections::HashMap;

use parking_lot::RwLock;

use fd_domain::tool::Message;

/// Conversation checkpoint store.
#[derive(Default)]
pub struct ConversationStore {
    histories: RwLock<HashMap<String, Vec<Message>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The checkpointed history for a session (empty for unknown sessions).
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.histories
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append messages to a session's history, creating it on first use.
    pub fn append(&self, session_id: &str, messages: impl IntoIterator<Item = Message>) {
        let mut histories = self.histories.write();
        histories
            .entry(session_id.to_owned())
            .or_default()
            .extend(messages);
    }

    /// Drop a session's history (eviction path).
    pub fn remove(&self, session_id: &str) {
        if self.histories.write().remove(session_id).is_some() {
            tracing::debug!(session_id = %session_id, "conversation checkpoint dropped");
        }
    }

    /// Number of messages checkpointed for a session.
    pub fn message_count(&self, session_id: &str) -> usize {
        self.histories
            .read()
            .get(session_id)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_has_empty_history() {
        let store = ConversationStore::new();
        assert!(store.history("ghost").is_empty());
        assert_eq!(store.message_count("ghost"), 0);
    }

    #[test]
    fn append_preserves_order_across_turns() {
        let store = ConversationStore::new();
        store.append(
            "s1",
            [
                Message::user("I'd like to book Tuesday at 14:00"),
                Message::assistant("May I have your name and date of birth?"),
            ],
        );
        store.append("s1", [Message::user("Kim Minji, 1990-03-02")]);

        let history = store.history("s1");
        assert_eq!(history.len(), 3);
        assert_eq!(
            history[0].content.text(),
            Some("I'd like to book Tuesday at 14:00")
        );
        assert_eq!(history[2].content.text(), Some("Kim Minji, 1990-03-02"));
    }

    #[test]
    fn sessions_are_isolated() {
        let store = ConversationStore::new();
        store.append("a", [Message::user("hello")]);
        store.append("b", [Message::user("world")]);
        assert_eq!(store.message_count("a"), 1);
        assert_eq!(store.message_count("b"), 1);
        assert_eq!(store.history("b")[0].content.text(), Some("world"));
    }

    #[test]
    fn remove_drops_checkpoint() {
        let store = ConversationStore::new();
        store.append("a", [Message::user("hello")]);
        store.remove("a");
        assert!(store.history("a").is_empty());
        // Removing twice is harmless.
        store.remove("a");
    }
}
