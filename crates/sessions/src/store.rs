//! Gateway-owned session store.
//!
//! Each session id maps to a [`SessionEntry`] tracking timestamps and
//! token counters. Entries live in process memory only and are bounded by
//! a capacity cap (LRU) plus an idle TTL, enforced by [`SessionStore::prune`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single session tracked by the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Completed turns in this session.
    pub turns: u64,
    /// Provider-reported token counters (operator-facing only).
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl SessionEntry {
    fn new(session_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_owned(),
            created_at: now,
            updated_at: now,
            turns: 0,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bounded in-memory session store.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_entries: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_entries: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_entries,
            idle_ttl,
        }
    }

    /// Look up a session by id.
    pub fn get(&self, session_id: &str) -> Option<SessionEntry> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Resolve or create a session for the given id. Returns `(entry, is_new)`.
    ///
    /// Concurrent first-time callers may race past the read; the write path
    /// re-checks, so at most one entry wins and the loser's construction is
    /// discarded.
    pub fn get_or_create(&self, session_id: &str) -> (SessionEntry, bool) {
        // Fast path: session already exists.
        {
            let sessions = self.sessions.read();
            if let Some(entry) = sessions.get(session_id) {
                return (entry.clone(), false);
            }
        }

        let mut sessions = self.sessions.write();
        if let Some(entry) = sessions.get(session_id) {
            return (entry.clone(), false);
        }

        let entry = SessionEntry::new(session_id, Utc::now());
        sessions.insert(session_id.to_owned(), entry.clone());
        tracing::info!(session_id = %session_id, "new session created");
        (entry, true)
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&self, session_id: &str) {
        let mut sessions = self.sessions.write();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.updated_at = Utc::now();
        }
    }

    /// Record a completed turn and its provider-reported token usage.
    pub fn record_usage(&self, session_id: &str, input_tokens: u64, output_tokens: u64) {
        let mut sessions = self.sessions.write();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.turns += 1;
            entry.input_tokens += input_tokens;
            entry.output_tokens += output_tokens;
            entry.total_tokens += input_tokens + output_tokens;
            entry.updated_at = Utc::now();
        }
    }

    /// Evict idle and over-capacity sessions. Returns the evicted ids so
    /// the caller can drop the matching conversation checkpoints.
    pub fn prune(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut sessions = self.sessions.write();
        let mut evicted = Vec::new();

        // Idle TTL sweep.
        let cutoff = now - self.idle_ttl;
        sessions.retain(|id, entry| {
            if entry.updated_at < cutoff {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });

        // Capacity cap: drop least-recently-used entries.
        if sessions.len() > self.max_entries {
            let mut by_age: Vec<(String, DateTime<Utc>)> = sessions
                .iter()
                .map(|(id, e)| (id.clone(), e.updated_at))
                .collect();
            by_age.sort_by_key(|(_, updated_at)| *updated_at);

            let overflow = sessions.len() - self.max_entries;
            for (id, _) in by_age.into_iter().take(overflow) {
                sessions.remove(&id);
                evicted.push(id);
            }
        }

        if !evicted.is_empty() {
            tracing::info!(
                evicted = evicted.len(),
                remaining = sessions.len(),
                "pruned sessions"
            );
        }

        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
