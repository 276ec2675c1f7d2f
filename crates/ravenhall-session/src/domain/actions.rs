//! Player and AI actions.
//!
//! Each action type is a tagged variant with named, typed fields; missing
//! fields and unknown action types are rejected when the payload is parsed,
//! before any handler runs.

use serde::{Deserialize, Serialize};

fn default_is_public() -> bool {
    true
}

fn default_mission_type() -> String {
    "general".to_owned()
}

/// One action submitted against a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum Action {
    /// Ask a character to introduce themselves.
    Monologue {
        /// The character to introduce.
        character_id: String,
        /// Caller-suggested model; a bound character model overrides it.
        #[serde(default)]
        model_name: Option<String>,
        /// Who triggered the action, for provider attribution.
        #[serde(default)]
        caller_id: Option<String>,
    },
    /// Pose a question to a character.
    Qna {
        /// The character being questioned.
        character_id: String,
        /// The asking player.
        questioner_id: String,
        /// The question.
        question: String,
        /// Caller-suggested model; a bound character model overrides it.
        #[serde(default)]
        model_name: Option<String>,
        /// Whether to mirror the exchange into the public log.
        #[serde(default = "default_is_public")]
        is_public: bool,
        /// Who triggered the action, for provider attribution.
        #[serde(default)]
        caller_id: Option<String>,
    },
    /// Submit a mission.
    MissionSubmit {
        /// The submitting player.
        player_id: String,
        /// Mission category.
        #[serde(default = "default_mission_type")]
        mission_type: String,
        /// Submission body.
        content: String,
    },
    /// Explicitly set the session phase.
    AdvancePhase {
        /// The phase to move to, as its external string.
        target_phase: String,
    },
    /// Advance to the next act.
    AdvanceAct,
    /// Make the final truth-or-silence decision and end the game.
    FinalChoice {
        /// The deciding player.
        player_id: String,
        /// Whether the player reveals the truth.
        tell_truth: bool,
    },
}

impl Action {
    /// Stable name of the action type, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Monologue { .. } => "monologue",
            Self::Qna { .. } => "qna",
            Self::MissionSubmit { .. } => "mission_submit",
            Self::AdvancePhase { .. } => "advance_phase",
            Self::AdvanceAct => "advance_act",
            Self::FinalChoice { .. } => "final_choice",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qna_action_parses_with_defaults() {
        let action: Action = serde_json::from_value(json!({
            "action_type": "qna",
            "character_id": "inspector",
            "questioner_id": "alice",
            "question": "Where were you at nine?",
        }))
        .unwrap();

        match action {
            Action::Qna {
                is_public,
                model_name,
                ..
            } => {
                assert!(is_public);
                assert!(model_name.is_none());
            }
            other => panic!("expected qna, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_type_is_rejected_at_parse_time() {
        let result: Result<Action, _> = serde_json::from_value(json!({
            "action_type": "bribe_the_butler",
        }));

        let err = result.unwrap_err().to_string();
        assert!(err.contains("bribe_the_butler"));
    }

    #[test]
    fn test_missing_fields_are_rejected_at_parse_time() {
        let result: Result<Action, _> = serde_json::from_value(json!({
            "action_type": "mission_submit",
            "player_id": "alice",
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_advance_act_parses_without_fields() {
        let action: Action = serde_json::from_value(json!({
            "action_type": "advance_act",
        }))
        .unwrap();

        assert!(matches!(action, Action::AdvanceAct));
        assert_eq!(action.kind(), "advance_act");
    }
}
