//! Test stores — `SessionStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ravenhall_core::error::EngineError;
use ravenhall_core::store::{SessionSnapshot, SessionStore};

/// An in-memory session store with the same compare-and-swap semantics as
/// the production store. Safe to share across tasks, which makes it the
/// workhorse for concurrency tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, (serde_json::Value, i64)>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current stored version for a session, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn version_of(&self, session_id: &str) -> Option<i64> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|(_, version)| *version)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<SessionSnapshot, EngineError> {
        let sessions = self.sessions.lock().unwrap();
        let (state, version) = sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_owned()))?;
        Ok(SessionSnapshot {
            session_id: session_id.to_owned(),
            state: state.clone(),
            version: *version,
        })
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), EngineError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&snapshot.session_id) {
            None if snapshot.version == 0 => {
                sessions.insert(
                    snapshot.session_id.clone(),
                    (snapshot.state.clone(), 1),
                );
                Ok(())
            }
            None => Err(EngineError::SessionNotFound(snapshot.session_id.clone())),
            Some((state, version)) => {
                if *version != snapshot.version {
                    return Err(EngineError::ConcurrencyConflict {
                        session_id: snapshot.session_id.clone(),
                        expected: snapshot.version,
                        actual: *version,
                    });
                }
                *state = snapshot.state.clone();
                *version += 1;
                Ok(())
            }
        }
    }
}

/// A session store that always fails with a persistence error.
#[derive(Debug, Default)]
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn load(&self, _session_id: &str) -> Result<SessionSnapshot, EngineError> {
        Err(EngineError::Persistence("connection refused".to_owned()))
    }

    async fn save(&self, _snapshot: &SessionSnapshot) -> Result<(), EngineError> {
        Err(EngineError::Persistence("connection refused".to_owned()))
    }
}
