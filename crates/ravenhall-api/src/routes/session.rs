//! Routes for game sessions: creation, joining, actions, and status.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use ravenhall_session::application::dispatcher::{ActionOutcome, process_action};
use ravenhall_session::application::lifecycle::{AiCharacterBinding, add_player, start_session};
use ravenhall_session::application::query_handlers::{SessionStatus, get_session_status};
use ravenhall_session::domain::actions::Action;
use ravenhall_session::domain::session::{GamePhase, SessionConfig};

use crate::error::ApiError;
use crate::state::AppState;

/// Request to seat an AI-driven character.
#[derive(Debug, Deserialize)]
pub struct AiCharacterRequest {
    /// The character to seat.
    pub character_id: String,
    /// The model to bind to the character.
    pub model_name: String,
}

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// The script to play.
    pub script_id: String,
    /// AI-driven characters to seat at creation.
    #[serde(default)]
    pub ai_characters: Vec<AiCharacterRequest>,
    /// Overrides the default act count.
    #[serde(default)]
    pub max_acts: Option<u32>,
    /// Overrides the default per-character per-act question pool.
    #[serde(default)]
    pub max_qna_per_character_per_act: Option<u32>,
    /// Overrides the default generation model.
    #[serde(default)]
    pub default_model: Option<String>,
}

/// Response body returned after session creation.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    /// The external lookup key.
    pub session_id: String,
    /// The game instance identifier.
    pub game_id: String,
    /// The script the session was created from.
    pub script_id: String,
    /// The starting phase.
    pub current_phase: GamePhase,
    /// Cast identifiers.
    pub characters: Vec<String>,
    /// Virtual seats created for AI-driven characters.
    pub ai_players: Vec<String>,
}

/// Request body for POST /{session_id}/players.
#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    /// The joining player.
    pub player_id: String,
    /// Character to bind to, if any.
    #[serde(default)]
    pub character_id: Option<String>,
}

/// Response body returned after a player joins.
#[derive(Debug, Serialize)]
pub struct JoinSessionResponse {
    /// The session joined.
    pub session_id: String,
    /// The joining player.
    pub player_id: String,
    /// Join order after the join.
    pub turn_order: Vec<String>,
}

/// POST /
#[instrument(skip(state, request), fields(script_id = %request.script_id))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let mut config = SessionConfig::default();
    if let Some(max_acts) = request.max_acts {
        config.max_acts = max_acts;
    }
    if let Some(pool) = request.max_qna_per_character_per_act {
        config.max_qna_per_character_per_act = pool;
    }
    if let Some(model) = request.default_model {
        config.default_model = model;
    }
    let bindings: Vec<AiCharacterBinding> = request
        .ai_characters
        .into_iter()
        .map(|b| AiCharacterBinding {
            character_id: b.character_id,
            model_name: b.model_name,
        })
        .collect();

    let session = start_session(
        &request.script_id,
        &bindings,
        config,
        state.clock.as_ref(),
        state.store.as_ref(),
        state.scripts.as_ref(),
    )
    .await?;

    info!(session_id = session.session_id(), "session created");

    Ok(Json(CreateSessionResponse {
        session_id: session.session_id().to_owned(),
        game_id: session.game_id().to_owned(),
        script_id: session.script_id().to_owned(),
        current_phase: session.current_phase(),
        characters: session.characters().keys().cloned().collect(),
        ai_players: session.players().keys().cloned().collect(),
    }))
}

/// POST /{session_id}/players
#[instrument(skip(state, request), fields(player_id = %request.player_id))]
async fn join_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<JoinSessionRequest>,
) -> Result<Json<JoinSessionResponse>, ApiError> {
    let session = add_player(
        &session_id,
        &request.player_id,
        request.character_id.as_deref(),
        state.clock.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(JoinSessionResponse {
        session_id,
        player_id: request.player_id,
        turn_order: session.turn_order().to_vec(),
    }))
}

/// POST /{session_id}/actions
#[instrument(skip(state, action), fields(action = action.kind()))]
async fn submit_action(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(action): Json<Action>,
) -> Result<Json<ActionOutcome>, ApiError> {
    let outcome = process_action(
        &session_id,
        &action,
        state.clock.as_ref(),
        state.store.as_ref(),
        state.dialogue.as_ref(),
    )
    .await?;

    Ok(Json(outcome))
}

/// GET /{session_id}/status
#[instrument(skip(state))]
async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatus>, ApiError> {
    let status = get_session_status(&session_id, state.store.as_ref()).await?;

    Ok(Json(status))
}

/// Returns the router for the session context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{session_id}/players", post(join_session))
        .route("/{session_id}/actions", post(submit_action))
        .route("/{session_id}/status", get(session_status))
}
