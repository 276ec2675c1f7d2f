//! The action dispatcher: the single entry point for mutating a session.
//!
//! Every call performs a versioned read-modify-write: load the session
//! snapshot, validate and run the handler against an in-memory copy, and
//! save with the version that was loaded. A concurrent writer makes the
//! save fail with a conflict, in which case the whole handler re-runs
//! against the fresh state; nothing from the losing attempt is persisted.
//! Handler failures likewise persist nothing.

use serde::Serialize;
use uuid::Uuid;

use ravenhall_core::clock::Clock;
use ravenhall_core::dialogue::{
    AnswerRequest, DialogueProvider, Generated, MAX_HISTORY_DIGEST_LEN, MonologueRequest,
    history_digest,
};
use ravenhall_core::error::EngineError;
use ravenhall_core::store::SessionStore;

use super::{CONFLICT_RETRIES, decode_session, encode_session};
use crate::domain::actions::Action;
use crate::domain::session::{GamePhase, LogKind, Session};

/// Sign-off phrase some models append to monologues; dropped when it is the
/// trailing sentence.
const MONOLOGUE_SIGN_OFF: &str = "My story ends here.";

/// Ending shown when the final choice reveals the truth.
const TRUTH_OUTCOME: &str = "The whole truth is laid bare in the drawing room. \
The case closes, and Ravenhall finally falls quiet.";

/// Ending shown when the final choice buries the truth.
const CONCEAL_OUTCOME: &str = "The secret leaves the manor unspoken. \
The guests depart one by one, and Ravenhall keeps its silence.";

/// Attribution forwarded to the provider when the action names no caller.
const SYSTEM_CALLER: &str = "system";

/// Structured result of a successfully dispatched action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// A monologue was generated and logged.
    Monologue {
        /// The introduced character.
        character_id: String,
        /// The monologue, split into display sentences.
        sentences: Vec<String>,
        /// Whether fallback text was substituted for a provider failure.
        degraded: bool,
        /// Phase after the action.
        current_phase: GamePhase,
    },
    /// A question was answered and recorded.
    Answer {
        /// The recorded Q&A entry.
        qna_id: Uuid,
        /// The questioned character.
        character_id: String,
        /// The asking player.
        questioner_id: String,
        /// The question as recorded.
        question: String,
        /// The answer as recorded.
        answer: String,
        /// Questions left in the shared pool for this character this act.
        remaining_questions: u32,
        /// Whether fallback text was substituted for a provider failure.
        degraded: bool,
        /// Phase after the action.
        current_phase: GamePhase,
    },
    /// A mission submission was recorded.
    MissionRecorded {
        /// The recorded submission.
        submission_id: Uuid,
        /// The submitting player.
        player_id: String,
        /// Mission category.
        mission_type: String,
        /// Phase after the action.
        current_phase: GamePhase,
    },
    /// The phase was explicitly changed.
    PhaseChanged {
        /// The phase now in effect.
        new_phase: GamePhase,
        /// The unchanged current act.
        current_act: u32,
    },
    /// The session advanced one act.
    ActAdvanced {
        /// The act now in effect.
        new_act: u32,
        /// Total acts in the session.
        max_acts: u32,
        /// Players whose question counters were reset.
        players_reset: usize,
        /// Phase after the action (always `monologue`).
        current_phase: GamePhase,
    },
    /// The final choice was made and the session completed.
    GameCompleted {
        /// The deciding player.
        player_id: String,
        /// Whether the truth was told.
        told_truth: bool,
        /// The ending narrative.
        outcome: String,
        /// Phase after the action (always `completed`).
        current_phase: GamePhase,
    },
}

/// Dispatches one action against a session.
///
/// # Errors
///
/// Returns [`EngineError::SessionNotFound`] for unknown sessions,
/// [`EngineError::Validation`] and [`EngineError::PolicyRejection`] per the
/// handler contracts, [`EngineError::ConcurrencyConflict`] when the write
/// race is lost more than [`CONFLICT_RETRIES`] times, and
/// [`EngineError::Persistence`] on store failure. Dialogue provider failures
/// never surface here; they degrade into fallback text.
pub async fn process_action(
    session_id: &str,
    action: &Action,
    clock: &dyn Clock,
    store: &dyn SessionStore,
    dialogue: &dyn DialogueProvider,
) -> Result<ActionOutcome, EngineError> {
    let mut conflict = None;

    for attempt in 0..=CONFLICT_RETRIES {
        let snapshot = store.load(session_id).await?;
        let mut session = decode_session(&snapshot)?;

        let outcome = apply_action(&mut session, action, clock, dialogue).await?;

        match store.save(&encode_session(&session, snapshot.version)?).await {
            Ok(()) => {
                tracing::info!(
                    session_id,
                    action = action.kind(),
                    phase = %session.current_phase(),
                    act = session.current_act(),
                    "action applied"
                );
                return Ok(outcome);
            }
            Err(err @ EngineError::ConcurrencyConflict { .. }) => {
                tracing::warn!(
                    session_id,
                    action = action.kind(),
                    attempt = attempt + 1,
                    "lost a concurrent write race, re-running the handler"
                );
                conflict = Some(err);
            }
            Err(other) => return Err(other),
        }
    }

    Err(conflict.unwrap_or_else(|| {
        EngineError::Persistence("conflict retry loop ended without a result".to_owned())
    }))
}

async fn apply_action(
    session: &mut Session,
    action: &Action,
    clock: &dyn Clock,
    dialogue: &dyn DialogueProvider,
) -> Result<ActionOutcome, EngineError> {
    match action {
        Action::Monologue {
            character_id,
            model_name,
            caller_id,
        } => {
            handle_monologue(
                session,
                character_id,
                model_name.as_deref(),
                caller_id.as_deref(),
                clock,
                dialogue,
            )
            .await
        }
        Action::Qna {
            character_id,
            questioner_id,
            question,
            model_name,
            is_public,
            caller_id,
        } => {
            handle_qna(
                session,
                character_id,
                questioner_id,
                question,
                model_name.as_deref(),
                *is_public,
                caller_id.as_deref(),
                clock,
                dialogue,
            )
            .await
        }
        Action::MissionSubmit {
            player_id,
            mission_type,
            content,
        } => handle_mission_submit(session, player_id, mission_type, content, clock),
        Action::AdvancePhase { target_phase } => {
            handle_advance_phase(session, target_phase, clock)
        }
        Action::AdvanceAct => handle_advance_act(session, clock),
        Action::FinalChoice {
            player_id,
            tell_truth,
        } => handle_final_choice(session, player_id, *tell_truth, clock),
    }
}

async fn handle_monologue(
    session: &mut Session,
    character_id: &str,
    model_name: Option<&str>,
    caller_id: Option<&str>,
    clock: &dyn Clock,
    dialogue: &dyn DialogueProvider,
) -> Result<ActionOutcome, EngineError> {
    let character_id = character_id.trim();
    if character_id.is_empty() {
        return Err(EngineError::Validation(
            "character_id is required for a monologue".to_owned(),
        ));
    }
    let Some(character) = session.character(character_id) else {
        return Err(EngineError::Validation(format!(
            "unknown character: {character_id}"
        )));
    };
    let character_name = character.name.clone();

    let request = MonologueRequest {
        character_id: character_id.to_owned(),
        act: session.current_act(),
        model: session.resolve_model(character_id, model_name),
        caller_id: effective_caller(caller_id),
    };
    let generated = match dialogue.generate_monologue(&request).await {
        Ok(text) => Generated::Ok(text),
        Err(err) => {
            tracing::error!(character_id, error = %err, "monologue generation failed, substituting fallback");
            Generated::Degraded {
                text: format!(
                    "I am sorry, {character_name} cannot introduce themselves right now. \
                     Please try again later."
                ),
                reason: err.to_string(),
            }
        }
    };

    let raw = generated.text().to_owned();
    let sentences = split_monologue(&raw);

    // The log keeps the raw text; the split is only for display pacing.
    session.append_log_entry(
        LogKind::Monologue,
        format!("[{character_id}] {raw}"),
        None,
        Some(character_id.to_owned()),
        clock.now(),
    );

    Ok(ActionOutcome::Monologue {
        character_id: character_id.to_owned(),
        sentences,
        degraded: generated.is_degraded(),
        current_phase: session.current_phase(),
    })
}

#[allow(clippy::too_many_arguments)]
async fn handle_qna(
    session: &mut Session,
    character_id: &str,
    questioner_id: &str,
    question: &str,
    model_name: Option<&str>,
    is_public: bool,
    caller_id: Option<&str>,
    clock: &dyn Clock,
    dialogue: &dyn DialogueProvider,
) -> Result<ActionOutcome, EngineError> {
    let character_id = character_id.trim();
    let questioner_id = questioner_id.trim();
    let question = question.trim();
    if character_id.is_empty() || questioner_id.is_empty() || question.is_empty() {
        return Err(EngineError::Validation(
            "character_id, questioner_id and question are required for a question".to_owned(),
        ));
    }
    let Some(character) = session.character(character_id) else {
        return Err(EngineError::Validation(format!(
            "unknown character: {character_id}"
        )));
    };
    let character_name = character.name.clone();

    let act = session.current_act();
    if !session.can_ask_question(character_id, act) {
        return Err(EngineError::PolicyRejection(format!(
            "question limit reached for character {character_id} in act {act}"
        )));
    }

    let history_lines: Vec<String> = session
        .public_log()
        .iter()
        .map(|entry| entry.text.clone())
        .collect();
    let request = AnswerRequest {
        character_id: character_id.to_owned(),
        act,
        question: question.to_owned(),
        history_digest: history_digest(&history_lines, character_id, MAX_HISTORY_DIGEST_LEN),
        model: session.resolve_model(character_id, model_name),
        caller_id: effective_caller(caller_id),
    };
    let generated = match dialogue.generate_answer(&request).await {
        Ok(text) => Generated::Ok(text),
        Err(err) => {
            tracing::error!(character_id, error = %err, "answer generation failed, substituting fallback");
            Generated::Degraded {
                text: format!(
                    "I am sorry, {character_name} cannot answer this question right now. \
                     Please try again later."
                ),
                reason: err.to_string(),
            }
        }
    };

    let entry = session.record_qna(
        questioner_id.to_owned(),
        character_id.to_owned(),
        question.to_owned(),
        generated.text().to_owned(),
        is_public,
        clock.now(),
    );
    if is_public {
        session.append_log_entry(
            LogKind::Qna,
            format!("Q: {question}\n[{character_id}] {}", entry.answer),
            Some(questioner_id.to_owned()),
            Some(character_id.to_owned()),
            clock.now(),
        );
    }

    Ok(ActionOutcome::Answer {
        qna_id: entry.id,
        character_id: character_id.to_owned(),
        questioner_id: questioner_id.to_owned(),
        question: entry.question,
        answer: entry.answer,
        remaining_questions: session.remaining_questions(character_id, act),
        degraded: generated.is_degraded(),
        current_phase: session.current_phase(),
    })
}

fn handle_mission_submit(
    session: &mut Session,
    player_id: &str,
    mission_type: &str,
    content: &str,
    clock: &dyn Clock,
) -> Result<ActionOutcome, EngineError> {
    let player_id = player_id.trim();
    if player_id.is_empty() || content.trim().is_empty() {
        return Err(EngineError::Validation(
            "player_id and content are required for a mission submission".to_owned(),
        ));
    }

    let submission = session.record_mission_submission(
        player_id.to_owned(),
        mission_type.to_owned(),
        content.trim().to_owned(),
        clock.now(),
    );
    session.append_log_entry(
        LogKind::MissionSubmission,
        format!("Player {player_id} submitted a {mission_type} mission"),
        Some(player_id.to_owned()),
        None,
        clock.now(),
    );

    Ok(ActionOutcome::MissionRecorded {
        submission_id: submission.id,
        player_id: player_id.to_owned(),
        mission_type: submission.mission_type,
        current_phase: session.current_phase(),
    })
}

fn handle_advance_phase(
    session: &mut Session,
    target_phase: &str,
    clock: &dyn Clock,
) -> Result<ActionOutcome, EngineError> {
    let new_phase: GamePhase = target_phase.trim().parse()?;

    session.set_phase(new_phase);
    session.append_log_entry(
        LogKind::PhaseChange,
        format!("Game phase changed to {new_phase}"),
        None,
        None,
        clock.now(),
    );

    Ok(ActionOutcome::PhaseChanged {
        new_phase,
        current_act: session.current_act(),
    })
}

fn handle_advance_act(
    session: &mut Session,
    clock: &dyn Clock,
) -> Result<ActionOutcome, EngineError> {
    let advance = session.advance_act()?;

    session.append_log_entry(
        LogKind::ActAdvance,
        format!(
            "The game advances to act {}; all question budgets are reset",
            advance.new_act
        ),
        None,
        None,
        clock.now(),
    );

    Ok(ActionOutcome::ActAdvanced {
        new_act: advance.new_act,
        max_acts: session.config().max_acts,
        players_reset: advance.players_reset,
        current_phase: session.current_phase(),
    })
}

fn handle_final_choice(
    session: &mut Session,
    player_id: &str,
    tell_truth: bool,
    clock: &dyn Clock,
) -> Result<ActionOutcome, EngineError> {
    if session.current_phase() == GamePhase::Completed {
        return Err(EngineError::PolicyRejection(
            "the session is already completed".to_owned(),
        ));
    }
    let player_id = player_id.trim();
    if player_id.is_empty() {
        return Err(EngineError::Validation(
            "player_id is required for the final choice".to_owned(),
        ));
    }

    let outcome = if tell_truth {
        TRUTH_OUTCOME
    } else {
        CONCEAL_OUTCOME
    };
    session.set_phase(GamePhase::Completed);
    session.append_log_entry(
        LogKind::GameCompleted,
        outcome.to_owned(),
        Some(player_id.to_owned()),
        None,
        clock.now(),
    );

    Ok(ActionOutcome::GameCompleted {
        player_id: player_id.to_owned(),
        told_truth: tell_truth,
        outcome: outcome.to_owned(),
        current_phase: session.current_phase(),
    })
}

fn effective_caller(caller_id: Option<&str>) -> String {
    caller_id
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(SYSTEM_CALLER)
        .to_owned()
}

/// Splits a monologue into display sentences on blank-line boundaries,
/// drops a trailing sign-off, and falls back to the raw text when nothing
/// remains.
fn split_monologue(raw: &str) -> Vec<String> {
    let mut sentences: Vec<String> = raw
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if let Some(last) = sentences.last()
        && last.contains(MONOLOGUE_SIGN_OFF)
    {
        sentences.pop();
    }
    if sentences.is_empty() {
        sentences.push(raw.trim().to_owned());
    }
    sentences
}
