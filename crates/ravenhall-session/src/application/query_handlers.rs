//! Read-side queries over persisted sessions.

use serde::Serialize;

use ravenhall_core::error::EngineError;
use ravenhall_core::store::SessionStore;

use super::decode_session;
use crate::domain::session::GamePhase;

/// Point-in-time summary of a session, cheap enough to poll.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// The external lookup key.
    pub session_id: String,
    /// The game instance identifier.
    pub game_id: String,
    /// The script the session was created from.
    pub script_id: String,
    /// The current phase.
    pub current_phase: GamePhase,
    /// The current act, 1-indexed.
    pub current_act: u32,
    /// Total acts in the session.
    pub max_acts: u32,
    /// Player join order.
    pub turn_order: Vec<String>,
    /// Pointer into `turn_order`.
    pub current_turn_index: usize,
    /// Number of joined players, AI seats included.
    pub player_count: usize,
    /// Entries in the public log.
    pub public_log_count: usize,
    /// Accepted questions across all acts, private ones included.
    pub qna_count: usize,
    /// Recorded mission submissions.
    pub mission_count: usize,
}

/// Loads a session and summarizes it.
///
/// # Errors
///
/// Returns [`EngineError::SessionNotFound`] for unknown sessions and
/// [`EngineError::Persistence`] when the stored state cannot be read.
pub async fn get_session_status(
    session_id: &str,
    store: &dyn SessionStore,
) -> Result<SessionStatus, EngineError> {
    let snapshot = store.load(session_id).await?;
    let session = decode_session(&snapshot)?;

    Ok(SessionStatus {
        session_id: session.session_id().to_owned(),
        game_id: session.game_id().to_owned(),
        script_id: session.script_id().to_owned(),
        current_phase: session.current_phase(),
        current_act: session.current_act(),
        max_acts: session.config().max_acts,
        turn_order: session.turn_order().to_vec(),
        current_turn_index: session.current_turn_index(),
        player_count: session.players().len(),
        public_log_count: session.public_log().len(),
        qna_count: session.qna_history().len(),
        mission_count: session.mission_submissions().len(),
    })
}
