//! In-memory conversation history keyed by session id.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::types::{Role, Session, Turn};

// ─────────────────────────────────────────────
// Trimming
// ─────────────────────────────────────────────

/// Trim `turns` to the last `2 × max_turns` entries, oldest first.
///
/// A window never starts with an assistant turn whose user turn was cut
/// off; that orphan is dropped as well. `max_turns == 0` disables trimming.
pub fn trim_window(turns: &mut Vec<Turn>, max_turns: usize) {
    if max_turns == 0 {
        return;
    }
    let keep = max_turns.saturating_mul(2);
    if turns.len() <= keep {
        return;
    }
    turns.drain(..turns.len() - keep);
    if turns.first().is_some_and(|t| t.role == Role::Assistant) {
        turns.remove(0);
    }
}

// ─────────────────────────────────────────────
// HistoryStore
// ─────────────────────────────────────────────

/// Process-local session history.
///
/// Each operation takes the map lock once, so individual appends are
/// atomic. Serializing whole exchanges is the caller's job.
#[derive(Debug, Default)]
pub struct HistoryStore {
    /// Turn pairs retained per session; 0 keeps everything.
    max_turns: usize,
    sessions: RwLock<HashMap<String, Session>>,
}

impl HistoryStore {
    pub fn new(max_turns: usize) -> Self {
        HistoryStore {
            max_turns,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Configured number of retained turn pairs (0 = unlimited).
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Snapshot of a session's turns, creating an empty session if absent.
    pub fn get_or_create(&self, key: &str) -> Vec<Turn> {
        if let Some(session) = self.read().get(key) {
            return session.turns.clone();
        }
        self.write()
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key))
            .turns
            .clone()
    }

    /// Append a turn and trim the session to the configured window.
    pub fn append(&self, key: &str, role: Role, text: impl Into<String>) {
        let mut sessions = self.write();
        let session = sessions
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key));
        session.turns.push(Turn::new(role, text));
        trim_window(&mut session.turns, self.max_turns);
        session.updated_at = Utc::now();
        debug!(session = key, role = %role, turns = session.turns.len(), "appended turn");
    }

    /// Record a completed exchange: the user turn and its reply go in
    /// together, then the session is trimmed once.
    pub fn record_exchange(
        &self,
        key: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) {
        let mut sessions = self.write();
        let session = sessions
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key));
        session.turns.push(Turn::user(user));
        session.turns.push(Turn::assistant(assistant));
        trim_window(&mut session.turns, self.max_turns);
        session.updated_at = Utc::now();
        debug!(session = key, turns = session.turns.len(), "recorded exchange");
    }

    /// Drop every turn of a session. The session itself is kept.
    pub fn clear(&self, key: &str) {
        let mut sessions = self.write();
        let session = sessions
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key));
        session.turns.clear();
        session.updated_at = Utc::now();
    }

    /// Number of turns currently held for a session (0 if unknown).
    pub fn len(&self, key: &str) -> usize {
        self.read().get(key).map_or(0, |s| s.turns.len())
    }

    /// Whether the session has been seen before.
    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Summaries of every known session, most recently updated first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .read()
            .values()
            .map(|s| SessionSummary {
                session_id: s.key.clone(),
                turns: s.turns.len(),
                created_at: s.created_at,
                updated_at: s.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Summary of a session for listing purposes.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub turns: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
