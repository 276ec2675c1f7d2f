//! Session store abstraction.
//!
//! Sessions are persisted as whole-state snapshots with an integer version.
//! Every writer performs a versioned read-modify-write: it loads a snapshot,
//! mutates its own copy, and saves with the version it loaded. A save whose
//! expected version no longer matches the stored version fails with
//! [`EngineError::ConcurrencyConflict`] instead of silently overwriting the
//! other writer's state.

use async_trait::async_trait;

use crate::error::EngineError;

/// Stored representation of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// External lookup key of the session.
    pub session_id: String,
    /// Serialized session state.
    pub state: serde_json::Value,
    /// The version this snapshot was loaded at. A snapshot that was never
    /// loaded (session creation) carries version 0.
    pub version: i64,
}

/// Port for loading and saving session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the snapshot for a session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] if no session exists for the
    /// identifier, or [`EngineError::Persistence`] on store failure.
    async fn load(&self, session_id: &str) -> Result<SessionSnapshot, EngineError>;

    /// Saves a snapshot, expecting the stored version to still equal
    /// `snapshot.version`. On success the stored version becomes
    /// `snapshot.version + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConcurrencyConflict`] if another writer saved
    /// in between, or [`EngineError::Persistence`] on store failure.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), EngineError>;
}
