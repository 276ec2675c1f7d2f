//! Application layer: loads sessions, runs handlers, persists snapshots.

pub mod dispatcher;
pub mod lifecycle;
pub mod query_handlers;

use ravenhall_core::error::EngineError;
use ravenhall_core::store::SessionSnapshot;

use crate::domain::session::Session;

/// How many times a mutating call re-runs after losing a versioned write
/// race before the conflict is surfaced to the caller.
pub const CONFLICT_RETRIES: u32 = 3;

pub(crate) fn decode_session(snapshot: &SessionSnapshot) -> Result<Session, EngineError> {
    serde_json::from_value(snapshot.state.clone()).map_err(|e| {
        EngineError::Persistence(format!(
            "corrupt session state for {}: {e}",
            snapshot.session_id
        ))
    })
}

pub(crate) fn encode_session(
    session: &Session,
    version: i64,
) -> Result<SessionSnapshot, EngineError> {
    let state = serde_json::to_value(session)
        .map_err(|e| EngineError::Persistence(format!("session serialization failed: {e}")))?;
    Ok(SessionSnapshot {
        session_id: session.session_id().to_owned(),
        state,
        version,
    })
}
