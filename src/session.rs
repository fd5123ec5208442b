//! In-process session store.
//!
//! Maps conversation ids to ordered, append-only turn histories, each
//! optionally owned by a user. This is the transient cache of the durable
//! session collection owned by the persistence collaborator: a read
//! immediately after an append reflects that append, but nothing here
//! survives a process restart, and external deletion of a session is
//! honoured via [`SessionStore::remove`].
//!
//! Locking is two-level: a read-write lock over the id map, and one mutex
//! per session around its state. Appends to the same session serialize;
//! operations on different sessions never block one another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::ConversationTurn;

struct SessionState {
    /// Identifier of the owning user, when the caller's auth layer
    /// supplies one.
    owner: Option<String>,
    turns: Vec<ConversationTurn>,
}

type Handle = Arc<Mutex<SessionState>>;

/// Thread-safe map of session id to conversation state.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Handle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new empty session and return its id.
    pub fn create(&self) -> String {
        self.insert(None)
    }

    /// Create a new empty session owned by a user.
    pub fn create_for(&self, user_id: impl Into<String>) -> String {
        self.insert(Some(user_id.into()))
    }

    fn insert(&self, owner: Option<String>) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().insert(
            id.clone(),
            Arc::new(Mutex::new(SessionState {
                owner,
                turns: Vec::new(),
            })),
        );
        id
    }

    /// Whether the id names a known session.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// The owning user of a session, when one was recorded.
    pub fn owner(&self, session_id: &str) -> Result<Option<String>> {
        let handle = self.handle(session_id)?;
        let owner = handle.lock().owner.clone();
        Ok(owner)
    }

    /// Append a turn to a session's history.
    ///
    /// Fails with [`Error::SessionNotFound`] for unknown ids; never
    /// creates a session implicitly.
    pub fn append(&self, session_id: &str, turn: ConversationTurn) -> Result<()> {
        let handle = self.handle(session_id)?;
        handle.lock().turns.push(turn);
        Ok(())
    }

    /// Consistent snapshot of a session's history in append order. An
    /// empty history is a valid result, not an error.
    pub fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let handle = self.handle(session_id)?;
        let snapshot = handle.lock().turns.clone();
        Ok(snapshot)
    }

    /// Drop a session. Called when the persistence collaborator reports
    /// an external deletion; the store never expires sessions on its own.
    pub fn remove(&self, session_id: &str) -> Result<()> {
        self.sessions
            .write()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    fn handle(&self, session_id: &str) -> Result<Handle> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn create_then_empty_history() {
        let store = SessionStore::new();
        let id = store.create();
        assert!(store.contains(&id));
        assert!(store.history(&id).unwrap().is_empty());
        assert_eq!(store.owner(&id).unwrap(), None);
    }

    #[test]
    fn create_for_records_owner() {
        let store = SessionStore::new();
        let id = store.create_for("user-42");
        assert_eq!(store.owner(&id).unwrap().as_deref(), Some("user-42"));
    }

    #[test]
    fn append_preserves_order() {
        let store = SessionStore::new();
        let id = store.create();
        store.append(&id, ConversationTurn::user("A")).unwrap();
        store.append(&id, ConversationTurn::assistant("B")).unwrap();
        store.append(&id, ConversationTurn::user("C")).unwrap();

        let history = store.history(&id).unwrap();
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["A", "B", "C"]);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn unknown_session_is_an_error() {
        let store = SessionStore::new();
        assert!(matches!(
            store.append("nope", ConversationTurn::user("hi")),
            Err(Error::SessionNotFound(_))
        ));
        assert!(matches!(
            store.history("nope"),
            Err(Error::SessionNotFound(_))
        ));
        assert!(!store.contains("nope"));
    }

    #[test]
    fn remove_honours_external_deletion() {
        let store = SessionStore::new();
        let id = store.create();
        store.remove(&id).unwrap();
        assert!(!store.contains(&id));
        assert!(store.remove(&id).is_err());
    }

    #[test]
    fn sessions_are_independent_under_interleaving() {
        let store = Arc::new(SessionStore::new());
        let a = store.create();
        let b = store.create();

        let mut handles = Vec::new();
        for (id, label) in [(a.clone(), "a"), (b.clone(), "b")] {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    store
                        .append(&id, ConversationTurn::user(format!("{label}{i}")))
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        for (id, label) in [(a, "a"), (b, "b")] {
            let history = store.history(&id).unwrap();
            assert_eq!(history.len(), 100);
            for (i, turn) in history.iter().enumerate() {
                assert_eq!(turn.content, format!("{label}{i}"));
            }
        }
    }
}
