use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;

use super::session::MatchSession;

/// Live match state keyed by room code.
///
/// Each entry is wrapped in its own `Mutex`, so all reads and writes for a
/// single room are serialized while rooms stay fully independent. At most
/// one session exists per code at any time; callers discard the entry when
/// the match ends or is abandoned.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<MatchSession>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session for `code`. Returns `false` when one is already
    /// live, leaving the existing session untouched.
    pub fn insert_new(&self, code: &str, session: MatchSession) -> bool {
        match self.sessions.entry(code.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(session)));
                true
            }
        }
    }

    /// Handle to the live session for `code`, if any.
    pub fn get(&self, code: &str) -> Option<Arc<Mutex<MatchSession>>> {
        self.sessions.get(code).map(|entry| entry.clone())
    }

    /// Discard the session for `code`. Returns whether one was present.
    pub fn remove(&self, code: &str) -> bool {
        self.sessions.remove(code).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_session() -> MatchSession {
        MatchSession::new(Vec::new())
    }

    #[test]
    fn at_most_one_session_per_code() {
        let store = SessionStore::new();
        assert!(store.insert_new("123456", empty_session()));
        assert!(!store.insert_new("123456", empty_session()));
        assert!(store.insert_new("654321", empty_session()));
    }

    #[test]
    fn removed_sessions_are_gone() {
        let store = SessionStore::new();
        store.insert_new("123456", empty_session());
        assert!(store.remove("123456"));
        assert!(store.get("123456").is_none());
        assert!(!store.remove("123456"));
    }
}
