//! Engine error taxonomy.

use thiserror::Error;

/// Top-level error type for session-engine operations.
///
/// Dialogue generation failures are deliberately absent: they are recovered
/// at the provider boundary with degraded fallback text and never surface as
/// an action failure. See [`crate::dialogue::DialogueError`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// No session exists for the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Optimistic concurrency conflict at the store boundary.
    #[error(
        "concurrency conflict on session {session_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The session that had the conflict.
        session_id: String,
        /// The version the writer loaded.
        expected: i64,
        /// The version actually stored.
        actual: i64,
    },

    /// Malformed or missing action fields, or an unknown target phase.
    #[error("validation error: {0}")]
    Validation(String),

    /// A structurally valid action that the state machine forbids right now.
    #[error("{0}")]
    PolicyRejection(String),

    /// Session store load/save failure.
    #[error("persistence error: {0}")]
    Persistence(String),
}
